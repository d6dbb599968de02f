//! Iterators spanning series boundaries

use crate::series::{Series, SeriesIter};
use crate::types::TelemValue;

/// Every sample of every series, in order
#[derive(Debug, Clone)]
pub struct MultiIter<'a> {
    series: &'a [Series],
    current: Option<SeriesIter<'a>>,
}

impl<'a> MultiIter<'a> {
    pub(super) fn new(series: &'a [Series]) -> Self {
        Self {
            series,
            current: None,
        }
    }
}

impl Iterator for MultiIter<'_> {
    type Item = TelemValue;

    fn next(&mut self) -> Option<TelemValue> {
        loop {
            if let Some(value) = self.current.as_mut().and_then(Iterator::next) {
                return Some(value);
            }
            let (first, rest) = self.series.split_first()?;
            self.current = Some(first.iter());
            self.series = rest;
        }
    }
}

/// Samples over a window of concatenated indexes
#[derive(Debug, Clone)]
pub struct MultiSubIter<'a> {
    series: &'a [Series],
    /// Series currently being read
    series_index: usize,
    /// Index within that series
    local_index: usize,
    remaining: usize,
}

impl<'a> MultiSubIter<'a> {
    /// Iterator over concatenated indexes `start..end`
    pub(super) fn new(series: &'a [Series], start: usize, end: usize) -> Self {
        let mut series_index = 0;
        let mut local_index = start;
        while let Some(s) = series.get(series_index) {
            if local_index < s.len() {
                break;
            }
            local_index -= s.len();
            series_index += 1;
        }
        Self {
            series,
            series_index,
            local_index,
            remaining: end.saturating_sub(start),
        }
    }

    pub(super) fn empty(series: &'a [Series]) -> Self {
        Self {
            series,
            series_index: 0,
            local_index: 0,
            remaining: 0,
        }
    }
}

impl Iterator for MultiSubIter<'_> {
    type Item = TelemValue;

    fn next(&mut self) -> Option<TelemValue> {
        if self.remaining == 0 {
            return None;
        }
        loop {
            let s = self.series.get(self.series_index)?;
            if self.local_index < s.len() {
                let value = s.value_at(self.local_index);
                self.local_index += 1;
                self.remaining -= 1;
                return value;
            }
            self.series_index += 1;
            self.local_index = 0;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use crate::multi::MultiSeries;
    use crate::series::Series;
    use crate::types::TelemValue;

    #[test]
    fn test_iter_skips_empty_series() {
        let multi = MultiSeries::new(vec![
            Series::from(vec![1u8]),
            Series::from(Vec::<u8>::new()),
            Series::from(vec![2u8, 3]),
        ])
        .unwrap();
        let values: Vec<_> = multi.iter().collect();
        assert_eq!(
            values,
            vec![
                TelemValue::Number(1.0),
                TelemValue::Number(2.0),
                TelemValue::Number(3.0)
            ]
        );
    }

    #[test]
    fn test_sub_iter_crosses_boundaries() {
        let multi = MultiSeries::new(vec![
            Series::from(vec![1i32, 2]),
            Series::from(vec![3i32, 4, 5]),
        ])
        .unwrap();
        let values: Vec<_> = multi.sub_iter(1, 4).filter_map(|v| v.as_f64()).collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
        assert_eq!(multi.sub_iter(4, 100).count(), 1);
        assert_eq!(multi.sub_iter(3, 1).count(), 0);
    }
}
