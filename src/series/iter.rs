//! Iterators over series samples
//!
//! Every iterator is finite and single-pass; create a new one to traverse
//! again.

use super::{format_uuid, parse_json_record, Series, SeriesBuffer, NEWLINE};
use crate::types::{Numeric, TelemValue};
use std::ops::Range;

/// Fixed-width numeric samples with the sample offset applied
#[derive(Debug, Clone)]
pub struct FixedIter<'a> {
    buffer: &'a SeriesBuffer,
    range: Range<usize>,
    offset: Numeric,
}

impl<'a> FixedIter<'a> {
    pub(super) fn new(buffer: &'a SeriesBuffer, range: Range<usize>, offset: Numeric) -> Self {
        Self { buffer, range, offset }
    }
}

impl Iterator for FixedIter<'_> {
    type Item = TelemValue;

    fn next(&mut self) -> Option<TelemValue> {
        let index = self.range.next()?;
        self.buffer
            .numeric(index)
            .map(|n| TelemValue::from(n.add(self.offset)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

/// UUIDs in canonical string form
#[derive(Debug, Clone)]
pub struct UuidIter<'a> {
    ids: std::slice::Iter<'a, [u8; 16]>,
}

impl<'a> UuidIter<'a> {
    pub(super) fn new(ids: &'a [[u8; 16]]) -> Self {
        Self { ids: ids.iter() }
    }
}

impl Iterator for UuidIter<'_> {
    type Item = TelemValue;

    fn next(&mut self) -> Option<TelemValue> {
        self.ids.next().map(|id| TelemValue::String(format_uuid(id)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

/// Newline-delimited string records
#[derive(Debug, Clone)]
pub struct StringIter<'a> {
    data: &'a [u8],
}

impl<'a> StringIter<'a> {
    pub(super) fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn next_record(&mut self) -> Option<String> {
        let end = self.data.iter().position(|b| *b == NEWLINE)?;
        let record = String::from_utf8_lossy(&self.data[..end]).into_owned();
        self.data = &self.data[end + 1..];
        Some(record)
    }
}

impl Iterator for StringIter<'_> {
    type Item = TelemValue;

    fn next(&mut self) -> Option<TelemValue> {
        self.next_record().map(TelemValue::String)
    }
}

/// JSON records. A record that fails to parse is logged and yielded as a string.
#[derive(Debug, Clone)]
pub struct JsonIter<'a> {
    records: StringIter<'a>,
}

impl<'a> JsonIter<'a> {
    pub(super) fn new(data: &'a [u8]) -> Self {
        Self {
            records: StringIter::new(data),
        }
    }
}

impl Iterator for JsonIter<'_> {
    type Item = TelemValue;

    fn next(&mut self) -> Option<TelemValue> {
        self.records.next_record().map(parse_json_record)
    }
}

/// Iterator over a whole series, chosen by data type
#[derive(Debug, Clone)]
pub enum SeriesIter<'a> {
    Fixed(FixedIter<'a>),
    Uuid(UuidIter<'a>),
    String(StringIter<'a>),
    Json(JsonIter<'a>),
}

impl Iterator for SeriesIter<'_> {
    type Item = TelemValue;

    fn next(&mut self) -> Option<TelemValue> {
        match self {
            SeriesIter::Fixed(it) => it.next(),
            SeriesIter::Uuid(it) => it.next(),
            SeriesIter::String(it) => it.next(),
            SeriesIter::Json(it) => it.next(),
        }
    }
}

/// Samples of one series over an index window
#[derive(Debug, Clone)]
pub struct SubIter<'a> {
    series: &'a Series,
    range: Range<usize>,
}

impl<'a> SubIter<'a> {
    pub(super) fn new(series: &'a Series, range: Range<usize>) -> Self {
        Self { series, range }
    }
}

impl Iterator for SubIter<'_> {
    type Item = TelemValue;

    fn next(&mut self) -> Option<TelemValue> {
        let index = self.range.next()?;
        self.series.value_at(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}
