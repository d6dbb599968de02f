//! Numeric conversion between data types

use super::{Series, SeriesBuffer};
use crate::error::{Result, TelemError};
use crate::types::{DataType, Numeric};
use tracing::debug;

impl Series {
    /// Convert every sample to `target`, subtracting `offset` first
    ///
    /// The offset is stored as the new series' sample offset, so reads return
    /// (approximately) the original values while the stored samples stay small.
    /// This is how nanosecond timestamps are narrowed to float32 for rendering
    /// without losing their relative precision.
    ///
    /// Big integer samples are differenced in integer space before narrowing.
    /// Converting to the same type returns a shared clone and ignores `offset`.
    /// Always copies; never done implicitly.
    pub fn convert(&self, target: DataType, offset: impl Into<Numeric>) -> Result<Series> {
        if target == self.data_type {
            return Ok(self.clone());
        }
        if !self.data_type.is_numeric() || !target.is_numeric() {
            return Err(TelemError::Unsupported(format!(
                "cannot convert {} series to {}",
                self.data_type, target
            )));
        }
        let offset = offset.into();
        let range = self.valid_range();
        let values: Vec<Numeric> = range
            .filter_map(|i| self.buffer.numeric(i))
            .map(|raw| convert_sample(raw, offset, target))
            .collect();
        debug!(
            key = %self.key,
            from = %self.data_type,
            to = %target,
            samples = values.len(),
            "converting series"
        );
        let buffer = SeriesBuffer::from_numerics(target, &values)?;
        let mut series = Series::from_buffer(buffer, target);
        series.sample_offset = offset;
        series.alignment = self.alignment;
        series.alignment_multiple = self.alignment_multiple;
        series.time_range = self.time_range;
        series.gl_usage = self.gl_usage;
        Ok(series)
    }
}

fn convert_sample(raw: Numeric, offset: Numeric, target: DataType) -> Numeric {
    let integral_offset = match offset {
        Numeric::BigInt(o) => Some(o),
        Numeric::Number(o) if o.is_finite() && o.fract() == 0.0 => Some(o as i128),
        Numeric::Number(_) => None,
    };
    match (raw, integral_offset) {
        (Numeric::BigInt(v), Some(o)) => {
            let delta = v.saturating_sub(o);
            if target.uses_big_int() {
                Numeric::BigInt(delta)
            } else {
                Numeric::Number(delta as f64)
            }
        }
        _ if target.uses_big_int() => Numeric::BigInt(raw.as_i128().saturating_sub(offset.as_i128())),
        _ => Numeric::Number(raw.as_f64() - offset.as_f64()),
    }
}
