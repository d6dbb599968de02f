//! MultiSeries: an ordered collection of same-typed series
//!
//! A [`MultiSeries`] presents its fragments as one logical sequence. Index
//! addressing runs across the fragments in order; alignment addressing uses
//! each fragment's alignment bounds, and positions not covered by any fragment
//! (gaps) simply hold no data.
//!
//! Fragments are expected to be pushed in ascending alignment order.

mod iter;

pub use iter::{MultiIter, MultiSubIter};

use crate::error::{Result, TelemError};
use crate::gl::{GlController, ReleaseOutcome};
use crate::series::{resolve_index, Series, SeriesBuffer};
use crate::time::TimeRange;
use crate::types::{Bounds, DataType, Numeric, TelemValue};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::trace;

#[derive(Debug, Clone, Default)]
pub struct MultiSeries {
    series: Vec<Series>,
}

impl MultiSeries {
    /// Build a collection, failing if the series disagree on data type
    pub fn new(series: Vec<Series>) -> Result<Self> {
        let mut multi = MultiSeries::default();
        for s in series {
            multi.push(s)?;
        }
        Ok(multi)
    }

    /// Data type of the first series, or unknown when empty
    pub fn data_type(&self) -> DataType {
        self.series
            .first()
            .map(Series::data_type)
            .unwrap_or(DataType::Unknown)
    }

    /// Append a series. An empty collection accepts any type.
    pub fn push(&mut self, series: Series) -> Result<()> {
        if !self.series.is_empty() && series.data_type() != self.data_type() {
            return Err(TelemError::type_mismatch(self.data_type(), series.data_type()));
        }
        trace!(key = series.key(), len = series.len(), "pushing series");
        self.series.push(series);
        Ok(())
    }

    /// Append every series of `other`
    pub fn push_multi(&mut self, other: MultiSeries) -> Result<()> {
        if !self.series.is_empty()
            && !other.series.is_empty()
            && other.data_type() != self.data_type()
        {
            return Err(TelemError::type_mismatch(self.data_type(), other.data_type()));
        }
        self.series.extend(other.series);
        Ok(())
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Total samples across every series
    pub fn len(&self) -> usize {
        self.series.iter().map(Series::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `index` of the concatenated sequence; negative counts from the end
    pub fn at(&self, index: i64) -> Option<TelemValue> {
        let mut index = resolve_index(index, self.len())?;
        for s in &self.series {
            let len = s.len();
            if index < len {
                return s.value_at(index);
            }
            index -= len;
        }
        None
    }

    pub fn try_at(&self, index: i64) -> Result<TelemValue> {
        self.at(index).ok_or_else(|| {
            TelemError::NotFound(format!(
                "index {} is out of bounds for multi-series of length {}",
                index,
                self.len()
            ))
        })
    }

    /// Sample at a logical alignment. Gaps between series hold no data.
    pub fn at_alignment(&self, alignment: u64) -> Option<TelemValue> {
        self.series
            .iter()
            .find(|s| s.alignment_bounds().contains(alignment))
            .and_then(|s| s.at_alignment(alignment))
    }

    pub fn try_at_alignment(&self, alignment: u64) -> Result<TelemValue> {
        self.at_alignment(alignment).ok_or_else(|| {
            TelemError::NotFound(format!("no sample at alignment {} in multi-series", alignment))
        })
    }

    /// From the lower bound of the first series to the upper bound of the last
    pub fn alignment_bounds(&self) -> Bounds<u64> {
        match (self.series.first(), self.series.last()) {
            (Some(first), Some(last)) => Bounds::new(
                first.alignment_bounds().lower,
                last.alignment_bounds().upper,
            ),
            _ => Bounds::new(0, 0),
        }
    }

    /// Start of the first series to the end of the last
    pub fn time_range(&self) -> Option<TimeRange> {
        let start = self.series.first()?.time_range()?.start;
        let end = self.series.last()?.time_range()?.end;
        Some(TimeRange::new(start, end))
    }

    /// Smallest bounds enclosing the bounds of every series
    pub fn bounds(&self) -> Result<Bounds<Numeric>> {
        let mut combined: Option<Bounds<Numeric>> = None;
        for s in &self.series {
            let b = s.bounds()?;
            combined = Some(match combined {
                Some(c) => c.max_combine(b),
                None => b,
            });
        }
        Ok(combined.unwrap_or(Bounds::new(
            Numeric::Number(f64::INFINITY),
            Numeric::Number(f64::NEG_INFINITY),
        )))
    }

    pub fn byte_length(&self) -> usize {
        self.series.iter().map(Series::byte_length).sum()
    }

    /// Every valid sample in one owned buffer, or `None` when empty
    pub fn data(&self) -> Option<SeriesBuffer> {
        let (first, rest) = self.series.split_first()?;
        let mut buffer = first.to_buffer();
        for s in rest {
            let part = s.to_buffer();
            // Types are checked on push, so the layouts always agree.
            buffer.extend_from(&part, 0..part.len()).ok()?;
        }
        Some(buffer)
    }

    /// Number of samples between two alignments, negative when `end < start`
    ///
    /// Only positions backed by a series count, so gaps contribute nothing and
    /// a series with multiple `m` contributes one sample per `m` positions.
    pub fn distance(&self, start: u64, end: u64) -> i64 {
        let (lo, hi, sign) = if start <= end {
            (start, end, 1)
        } else {
            (end, start, -1)
        };
        let total: u64 = self.series.iter().map(|s| s.samples_between(lo, hi)).sum();
        sign * total as i64
    }

    /// Alignment reached by stepping `delta` samples from `start`
    ///
    /// Steps skip over gaps. Stepping past either end of the collection stops
    /// at its outermost bound.
    pub fn traverse_alignment(&self, start: u64, delta: i64) -> u64 {
        if delta >= 0 {
            self.traverse_forward(start, delta.unsigned_abs())
        } else {
            self.traverse_backward(start, delta.unsigned_abs())
        }
    }

    fn traverse_forward(&self, start: u64, mut remaining: u64) -> u64 {
        let mut pos = start;
        while remaining > 0 {
            if let Some(s) = self.series.iter().find(|s| s.alignment_bounds().contains(pos)) {
                let bounds = s.alignment_bounds();
                let m = s.alignment_multiple();
                let taken = (pos - bounds.lower).div_ceil(m);
                let available = ((bounds.upper - bounds.lower) / m).saturating_sub(taken);
                if available == 0 {
                    // past the last sample, or the upper bound saturated
                    pos = bounds.upper;
                    continue;
                }
                let step = remaining.min(available);
                pos = bounds.lower.saturating_add((taken + step).saturating_mul(m));
                remaining -= step;
                continue;
            }
            match self
                .series
                .iter()
                .map(|s| s.alignment_bounds())
                .filter(|b| !b.is_empty() && b.lower > pos)
                .map(|b| b.lower)
                .min()
            {
                Some(next) => pos = next,
                None => break,
            }
        }
        pos
    }

    fn traverse_backward(&self, start: u64, mut remaining: u64) -> u64 {
        let mut pos = start;
        while remaining > 0 {
            if let Some(s) = self.series.iter().find(|s| {
                let b = s.alignment_bounds();
                b.lower < pos && pos <= b.upper
            }) {
                let bounds = s.alignment_bounds();
                let m = s.alignment_multiple();
                let before = (pos - bounds.lower).div_ceil(m);
                let step = remaining.min(before);
                pos = bounds.lower.saturating_add((before - step).saturating_mul(m));
                remaining -= step;
                continue;
            }
            match self
                .series
                .iter()
                .map(|s| s.alignment_bounds())
                .filter(|b| !b.is_empty() && b.upper < pos)
                .map(|b| b.upper)
                .max()
            {
                Some(prev) => pos = prev,
                None => break,
            }
        }
        pos
    }

    /// Iterator over every sample of every series
    pub fn iter(&self) -> MultiIter<'_> {
        MultiIter::new(&self.series)
    }

    /// Iterator over concatenated indexes `start..end`
    pub fn sub_iter(&self, start: usize, end: usize) -> MultiSubIter<'_> {
        let end = end.min(self.len());
        MultiSubIter::new(&self.series, start.min(end), end)
    }

    /// Iterator over the samples whose alignment lies in `[start, end)`
    pub fn sub_alignment_iter(&self, start: u64, end: u64) -> MultiSubIter<'_> {
        let bounds = self.alignment_bounds();
        if start >= bounds.upper || end <= bounds.lower || end <= start {
            return MultiSubIter::empty(&self.series);
        }
        self.sub_iter(self.index_of_alignment(start), self.index_of_alignment(end))
    }

    /// Iterator over at most `span` samples starting at alignment `start`
    pub fn sub_alignment_span_iter(&self, start: u64, span: usize) -> MultiSubIter<'_> {
        let bounds = self.alignment_bounds();
        if start >= bounds.upper || span == 0 {
            return MultiSubIter::empty(&self.series);
        }
        let available = self.distance(start, bounds.upper).max(0) as usize;
        let begin = self.index_of_alignment(start);
        self.sub_iter(begin, begin + span.min(available))
    }

    /// Concatenated index of the first sample at or after `alignment`
    fn index_of_alignment(&self, alignment: u64) -> usize {
        let mut index = 0;
        for s in &self.series {
            if alignment < s.alignment() {
                break;
            }
            let offset = (alignment - s.alignment()).div_ceil(s.alignment_multiple());
            index += usize::try_from(offset).map_or(s.len(), |o| o.min(s.len()));
        }
        index
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.series.iter().flat_map(Series::to_strings).collect()
    }

    pub fn parse_json<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let mut out = Vec::new();
        for s in &self.series {
            out.extend(s.parse_json::<T>()?);
        }
        Ok(out)
    }

    /// Take a GPU reference on every series and upload them
    ///
    /// All or nothing: if any series fails, the references already taken are
    /// released again.
    pub fn acquire_with<C: GlController + ?Sized>(&mut self, gl: &mut C) -> Result<()> {
        for i in 0..self.series.len() {
            if let Err(err) = self.series[i].acquire_with(gl) {
                for s in &mut self.series[..i] {
                    s.release(gl);
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Release one GPU reference from every series
    pub fn release<C: GlController + ?Sized>(&mut self, gl: &mut C) -> Vec<ReleaseOutcome> {
        self.series.iter_mut().map(|s| s.release(gl)).collect()
    }

    pub fn update_gl_buffer<C: GlController + ?Sized>(&mut self, gl: &mut C) -> Result<()> {
        self.series.iter_mut().try_for_each(|s| s.update_gl_buffer(gl))
    }
}

impl<'a> IntoIterator for &'a MultiSeries {
    type Item = TelemValue;
    type IntoIter = MultiIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl TryFrom<Vec<Series>> for MultiSeries {
    type Error = TelemError;

    fn try_from(series: Vec<Series>) -> Result<Self> {
        MultiSeries::new(series)
    }
}

impl fmt::Display for MultiSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "MultiSeries(type: {}, len: {}, series: {})",
            self.data_type(),
            self.len(),
            self.series.len()
        )?;
        for s in &self.series {
            writeln!(f, "  {}", s)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats(values: &[f32], alignment: u64) -> Series {
        Series::from(values.to_vec()).with_alignment(alignment)
    }

    fn gapped() -> MultiSeries {
        MultiSeries::new(vec![floats(&[1.0, 2.0, 3.0], 2), floats(&[6.0, 7.0, 8.0, 9.0, 10.0], 8)])
            .unwrap()
    }

    #[test]
    fn test_push_type_mismatch() {
        let mut multi = MultiSeries::new(vec![floats(&[1.0], 0)]).unwrap();
        let err = multi.push(Series::from(vec![1u8])).unwrap_err();
        assert!(matches!(err, TelemError::TypeMismatch { .. }));
        assert_eq!(multi.series().len(), 1);
    }

    #[test]
    fn test_empty_accepts_any_type() {
        let mut multi = MultiSeries::default();
        assert_eq!(multi.data_type(), DataType::Unknown);
        multi.push(Series::from(vec![1u8])).unwrap();
        assert_eq!(multi.data_type(), DataType::Uint8);
    }

    #[test]
    fn test_at_spans_series() {
        let multi = gapped();
        assert_eq!(multi.len(), 8);
        assert_eq!(multi.at(3), Some(TelemValue::Number(6.0)));
        assert_eq!(multi.at(-1), Some(TelemValue::Number(10.0)));
        assert_eq!(multi.at(8), None);
    }

    #[test]
    fn test_at_alignment_gap_is_empty() {
        let multi = gapped();
        assert_eq!(multi.at_alignment(4), Some(TelemValue::Number(3.0)));
        assert_eq!(multi.at_alignment(6), None);
        assert_eq!(multi.at_alignment(8), Some(TelemValue::Number(6.0)));
        assert!(multi.try_at_alignment(100).is_err());
    }

    #[test]
    fn test_distance_skips_gaps() {
        let multi = gapped();
        assert_eq!(multi.distance(2, 13), 8);
        assert_eq!(multi.distance(3, 9), 3);
        assert_eq!(multi.distance(9, 3), -3);
        assert_eq!(multi.distance(5, 8), 0);
    }

    #[test]
    fn test_traverse_skips_gaps() {
        let multi = gapped();
        assert_eq!(multi.traverse_alignment(2, 4), 9);
        assert_eq!(multi.traverse_alignment(9, -4), 2);
        assert_eq!(multi.traverse_alignment(3, 0), 3);
        assert_eq!(multi.traverse_alignment(2, 100), 13);
        assert_eq!(multi.traverse_alignment(9, -100), 2);
    }

    #[test]
    fn test_traverse_with_multiple() {
        let multi = MultiSeries::new(vec![
            floats(&[1.0, 2.0], 0).with_alignment_multiple(5),
            floats(&[3.0, 4.0], 20).with_alignment_multiple(5),
        ])
        .unwrap();
        assert_eq!(multi.traverse_alignment(0, 1), 5);
        assert_eq!(multi.traverse_alignment(0, 3), 25);
        assert_eq!(multi.distance(0, 25), 3);
        assert_eq!(multi.traverse_alignment(25, -3), 0);
        // between the last sample of a series and its upper bound
        assert_eq!(multi.traverse_alignment(6, 1), 25);
    }

    #[test]
    fn test_data_concatenates() {
        let multi = gapped();
        let data = multi.data().unwrap();
        assert_eq!(
            data,
            SeriesBuffer::Float32(vec![1.0, 2.0, 3.0, 6.0, 7.0, 8.0, 9.0, 10.0])
        );
        assert!(MultiSeries::default().data().is_none());
        assert_eq!(multi.byte_length(), 32);
    }

    #[test]
    fn test_bounds_and_time_range() {
        let multi = MultiSeries::new(vec![
            floats(&[1.0, 5.0], 0).with_time_range(TimeRange::from_nanos(0, 10)),
            floats(&[-2.0, 3.0], 2).with_time_range(TimeRange::from_nanos(10, 30)),
        ])
        .unwrap();
        let bounds = multi.bounds().unwrap();
        assert_eq!(bounds.lower, Numeric::Number(-2.0));
        assert_eq!(bounds.upper, Numeric::Number(5.0));
        assert_eq!(multi.time_range(), Some(TimeRange::from_nanos(0, 30)));
        assert_eq!(multi.alignment_bounds(), Bounds::new(0, 4));
    }

    #[test]
    fn test_span_iter_clamps() {
        let multi = gapped();
        let values: Vec<_> = multi
            .sub_alignment_span_iter(3, 100)
            .filter_map(|v| v.as_f64())
            .collect();
        assert_eq!(values, vec![2.0, 3.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        let values: Vec<_> = multi
            .sub_alignment_span_iter(3, 3)
            .filter_map(|v| v.as_f64())
            .collect();
        assert_eq!(values, vec![2.0, 3.0, 6.0]);
        assert_eq!(multi.sub_alignment_span_iter(13, 4).count(), 0);
    }

    #[test]
    fn test_sub_alignment_iter_outside_bounds() {
        let multi = gapped();
        assert_eq!(multi.sub_alignment_iter(0, 2).count(), 0);
        assert_eq!(multi.sub_alignment_iter(13, 20).count(), 0);
        assert_eq!(multi.sub_alignment_iter(0, 100).count(), 8);
    }

    #[test]
    fn test_strings_and_display() {
        let multi = MultiSeries::new(vec![
            Series::from_strings(["a"]).unwrap(),
            Series::from_strings(["b", "c"]).unwrap(),
        ])
        .unwrap();
        assert_eq!(multi.to_strings(), vec!["a", "b", "c"]);
        assert!(multi.to_string().starts_with("MultiSeries(type: string, len: 3, series: 2)"));
        assert!(multi.bounds().is_err());
    }
}
