//! Test data builders for creating test objects

use telem_rs::{DataType, Series, TimeRange};

/// Builder for creating test Series
pub struct SeriesBuilder {
    values: Vec<f64>,
    data_type: DataType,
    alignment: u64,
    alignment_multiple: u64,
    time_range: Option<TimeRange>,
    capacity: Option<usize>,
}

impl SeriesBuilder {
    pub fn new(values: &[f64]) -> Self {
        Self {
            values: values.to_vec(),
            data_type: DataType::Float32,
            alignment: 0,
            alignment_multiple: 1,
            time_range: None,
            capacity: None,
        }
    }

    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn alignment(mut self, alignment: u64) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn alignment_multiple(mut self, multiple: u64) -> Self {
        self.alignment_multiple = multiple;
        self
    }

    pub fn time_range(mut self, start: i64, end: i64) -> Self {
        self.time_range = Some(TimeRange::from_nanos(start, end));
        self
    }

    /// Allocate with this capacity and write the values in, instead of
    /// building a complete series
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn build(self) -> Series {
        let values = self.values.into_iter().map(telem_rs::TelemValue::Number).collect();
        let complete = Series::from_values(values, Some(self.data_type)).expect("numeric values");
        let mut series = match self.capacity {
            Some(capacity) => {
                let mut series = Series::alloc(capacity, self.data_type).expect("valid capacity");
                series.write(&complete).expect("same data type");
                series
            }
            None => complete,
        };
        series = series
            .with_alignment(self.alignment)
            .with_alignment_multiple(self.alignment_multiple);
        if let Some(tr) = self.time_range {
            series = series.with_time_range(tr);
        }
        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_builder() {
        let series = SeriesBuilder::new(&[1.0, 2.0])
            .data_type(DataType::Uint8)
            .alignment(10)
            .alignment_multiple(2)
            .capacity(4)
            .build();

        assert_eq!(series.data_type(), DataType::Uint8);
        assert_eq!(series.len(), 2);
        assert_eq!(series.capacity(), 4);
        assert_eq!(series.alignment(), 10);
        assert_eq!(series.alignment_multiple(), 2);
    }
}
