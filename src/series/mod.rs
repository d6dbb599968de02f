//! Series: a typed telemetry array with alignment addressing
//!
//! A [`Series`] is a view into a shared, typed buffer. Series built from
//! complete data are read-only; series made with [`Series::alloc`] start empty
//! and are filled by [`Series::write`] until their fixed capacity is reached.
//!
//! Every series also occupies the interval
//! `[alignment, alignment + len * alignment_multiple)` of a logical ordering
//! space shared with its siblings, which is how a [`crate::MultiSeries`]
//! stitches fragments into one sequence.
//!
//! # Example
//!
//! ```
//! use telem_rs::{DataType, Series, TelemValue};
//!
//! let mut series = Series::alloc(10, DataType::Float32).unwrap();
//! series.write(&Series::from(vec![1.0f32, 2.0, 3.0])).unwrap();
//! assert_eq!(series.len(), 3);
//! assert_eq!(series.at(-1), Some(TelemValue::Number(3.0)));
//! ```

mod buffer;
mod convert;
pub mod crude;
mod iter;

pub use buffer::{format_uuid, parse_uuid, NativeSample, SeriesBuffer, NEWLINE};
pub use crude::CrudeSeries;
pub use iter::{FixedIter, JsonIter, SeriesIter, StringIter, SubIter, UuidIter};

use crate::error::{Result, TelemError};
use crate::gl::{GlBufferHandle, GlBufferState, GlController, GlUsage, ReleaseOutcome, Upload};
use crate::time::{TimeRange, TimeStamp};
use crate::types::{Bounds, DataType, Numeric, TelemValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::{Cell, OnceCell};
use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Global counter for generating unique series keys
static NEXT_SERIES_KEY: AtomicU64 = AtomicU64::new(1);

fn generate_key() -> String {
    format!("series-{}", NEXT_SERIES_KEY.fetch_add(1, Ordering::SeqCst))
}

/// Value bounds of a series with no samples
const EMPTY_BOUNDS: Bounds<Numeric> = Bounds {
    lower: Numeric::Number(f64::INFINITY),
    upper: Numeric::Number(f64::NEG_INFINITY),
};

/// End of the valid region of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WritePos {
    /// The whole buffer is valid data
    Full,
    /// Valid data ends here (samples, or bytes for variable types)
    At(usize),
}

/// Lifecycle of a series, derived from its write cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesState {
    /// Built from complete data; writes are no-ops
    Complete,
    /// Allocated and accepting writes
    Filling,
    /// Allocated and at capacity; writes return 0
    Full,
}

/// Input accepted by [`Series::new`]
#[derive(Debug)]
pub enum SeriesData {
    /// An already typed buffer
    Buffer(SeriesBuffer),
    /// Native-endian bytes; requires an explicit data type
    Bytes(Vec<u8>),
    /// Homogeneous values
    Values(Vec<TelemValue>),
    /// JSON values, mapped to the inferred (or given) type
    Json(Vec<serde_json::Value>),
    /// An existing series, taken as is
    Series(Series),
}

impl From<SeriesBuffer> for SeriesData {
    fn from(buffer: SeriesBuffer) -> Self {
        SeriesData::Buffer(buffer)
    }
}

impl<T: NativeSample> From<Vec<T>> for SeriesData {
    fn from(values: Vec<T>) -> Self {
        SeriesData::Buffer(T::wrap(values))
    }
}

impl From<Vec<TelemValue>> for SeriesData {
    fn from(values: Vec<TelemValue>) -> Self {
        SeriesData::Values(values)
    }
}

impl From<TelemValue> for SeriesData {
    fn from(value: TelemValue) -> Self {
        SeriesData::Values(vec![value])
    }
}

impl From<Vec<serde_json::Value>> for SeriesData {
    fn from(values: Vec<serde_json::Value>) -> Self {
        SeriesData::Json(values)
    }
}

impl From<Series> for SeriesData {
    fn from(series: Series) -> Self {
        SeriesData::Series(series)
    }
}

/// Summary of a series for logs and debugging output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesDigest {
    pub key: String,
    pub data_type: DataType,
    pub sample_offset: String,
    pub alignment: Bounds<u64>,
    pub time_range: Option<TimeRange>,
    pub length: usize,
    pub capacity: usize,
}

/// A typed, aligned telemetry array
#[derive(Debug)]
pub struct Series {
    key: String,
    data_type: DataType,
    buffer: Arc<SeriesBuffer>,
    /// First slot of this view within `buffer`
    view_offset: usize,
    /// Slots addressable by this view (bytes for variable types)
    view_capacity: usize,
    write_pos: WritePos,
    sample_offset: Numeric,
    alignment: u64,
    alignment_multiple: u64,
    time_range: Option<TimeRange>,
    gl_usage: GlUsage,
    cached_bounds: Cell<Option<Bounds<Numeric>>>,
    /// Byte ranges of each record, relative to the view (variable types only)
    record_offsets: OnceCell<Vec<Range<usize>>>,
    gl: GlBufferState,
}

impl Series {
    /// Build a series from any supported input
    ///
    /// Without an explicit data type, the type is inferred from the first
    /// element (string → string, number → float64, bigint → int64,
    /// bool → uint8, timestamp → timestamp, json → json). A typed buffer
    /// paired with a different data type is reinterpreted byte for byte.
    pub fn new(data: impl Into<SeriesData>, data_type: Option<DataType>) -> Result<Series> {
        match data.into() {
            SeriesData::Buffer(mut buffer) => match data_type {
                Some(dt) if !buffer.stores(dt) => Self::from_bytes(buffer.as_bytes(), Some(dt)),
                dt => {
                    let dt = dt.unwrap_or_else(|| buffer.natural_data_type());
                    if let SeriesBuffer::Variable(bytes) = &mut buffer {
                        if bytes.last().is_some_and(|b| *b != NEWLINE) {
                            bytes.push(NEWLINE);
                        }
                    }
                    Ok(Self::from_buffer(buffer, dt))
                }
            },
            SeriesData::Bytes(bytes) => Self::from_bytes(&bytes, data_type),
            SeriesData::Values(values) => Self::from_values(values, data_type),
            SeriesData::Json(values) => Self::from_json(values, data_type),
            SeriesData::Series(series) => match data_type {
                Some(dt) if dt != series.data_type => {
                    Err(TelemError::type_mismatch(dt, series.data_type))
                }
                _ => Ok(series),
            },
        }
    }

    fn from_buffer(buffer: SeriesBuffer, data_type: DataType) -> Series {
        let capacity = buffer.len();
        Series {
            key: generate_key(),
            data_type,
            buffer: Arc::new(buffer),
            view_offset: 0,
            view_capacity: capacity,
            write_pos: WritePos::Full,
            sample_offset: Numeric::ZERO,
            alignment: 0,
            alignment_multiple: 1,
            time_range: None,
            gl_usage: GlUsage::default(),
            cached_bounds: Cell::new(None),
            record_offsets: OnceCell::new(),
            gl: GlBufferState::default(),
        }
    }

    /// Interpret native-endian bytes as samples of `data_type`
    pub fn from_bytes(bytes: &[u8], data_type: Option<DataType>) -> Result<Series> {
        let data_type = data_type.ok_or_else(|| {
            TelemError::Construction("a data type is required to interpret raw bytes".to_string())
        })?;
        let buffer = SeriesBuffer::from_bytes(data_type, bytes)?;
        Ok(Self::from_buffer(buffer, data_type))
    }

    /// Build a series from homogeneous values
    pub fn from_values(values: Vec<TelemValue>, data_type: Option<DataType>) -> Result<Series> {
        let data_type = match data_type {
            Some(dt) => dt,
            None => values
                .first()
                .map(TelemValue::inferred_data_type)
                .ok_or_else(|| {
                    TelemError::Construction(
                        "cannot infer the data type of an empty array".to_string(),
                    )
                })?,
        };
        let buffer = match data_type {
            DataType::Unknown => {
                return Err(TelemError::Construction(
                    "cannot construct a series of unknown data type".to_string(),
                ))
            }
            DataType::String | DataType::Json => {
                let mut bytes = Vec::new();
                for value in &values {
                    encode_record(&mut bytes, value, data_type)?;
                }
                SeriesBuffer::Variable(bytes)
            }
            DataType::Uuid => SeriesBuffer::Uuid(
                values
                    .iter()
                    .map(|v| match v {
                        TelemValue::String(s) => parse_uuid(s),
                        other => Err(TelemError::Construction(format!(
                            "cannot store '{}' in a uuid series",
                            other
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            dt => {
                let numerics = values
                    .iter()
                    .map(|v| {
                        v.as_numeric().ok_or_else(|| {
                            TelemError::Construction(format!(
                                "cannot store '{}' in a {} series",
                                v, dt
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                SeriesBuffer::from_numerics(dt, &numerics)?
            }
        };
        Ok(Self::from_buffer(buffer, data_type))
    }

    /// Build a series from JSON values
    ///
    /// The type is inferred from the first value: strings, numbers and
    /// booleans map to string, float64 and uint8; objects and arrays map to
    /// json. `null` cannot be inferred.
    pub fn from_json(values: Vec<serde_json::Value>, data_type: Option<DataType>) -> Result<Series> {
        use serde_json::Value;
        let data_type = match data_type {
            Some(dt) => dt,
            None => match values.first() {
                None => {
                    return Err(TelemError::Construction(
                        "cannot infer the data type of an empty array".to_string(),
                    ))
                }
                Some(Value::Null) => {
                    return Err(TelemError::Construction(
                        "cannot infer a data type from null".to_string(),
                    ))
                }
                Some(Value::String(_)) => DataType::String,
                Some(Value::Number(_)) => DataType::Float64,
                Some(Value::Bool(_)) => DataType::BOOLEAN,
                Some(_) => DataType::Json,
            },
        };
        let values = values
            .into_iter()
            .map(|v| TelemValue::from_json(v, data_type))
            .collect();
        Self::from_values(values, Some(data_type))
    }

    pub fn from_strings<I, S>(items: I) -> Result<Series>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = items
            .into_iter()
            .map(|s| TelemValue::String(s.into()))
            .collect();
        Self::from_values(values, Some(DataType::String))
    }

    pub fn from_timestamps(stamps: Vec<TimeStamp>) -> Series {
        let nanos = stamps.iter().map(TimeStamp::nanos).collect();
        Self::from_buffer(SeriesBuffer::TimeStamp(nanos), DataType::TimeStamp)
    }

    pub fn from_uuids(ids: Vec<[u8; 16]>) -> Series {
        Self::from_buffer(SeriesBuffer::Uuid(ids), DataType::Uuid)
    }

    /// Allocate an empty series that accepts up to `capacity` samples
    ///
    /// For string and json series the capacity is measured in bytes.
    pub fn alloc(capacity: usize, data_type: DataType) -> Result<Series> {
        if capacity == 0 {
            return Err(TelemError::Capacity(
                "cannot allocate a series with zero capacity".to_string(),
            ));
        }
        let buffer = SeriesBuffer::zeroed(data_type, capacity)?;
        debug!(capacity, %data_type, "allocated series");
        let mut series = Self::from_buffer(buffer, data_type);
        series.write_pos = WritePos::At(0);
        Ok(series)
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_alignment(mut self, alignment: u64) -> Self {
        self.alignment = alignment;
        self
    }

    /// Set how many logical positions each sample spans. Zero is treated as one.
    pub fn with_alignment_multiple(mut self, multiple: u64) -> Self {
        self.alignment_multiple = multiple.max(1);
        self
    }

    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = Some(time_range);
        self
    }

    /// Set the bias added to every numeric sample on read
    pub fn with_sample_offset(mut self, offset: impl Into<Numeric>) -> Self {
        self.sample_offset = offset.into();
        self.cached_bounds.set(None);
        self
    }

    pub fn with_gl_usage(mut self, usage: GlUsage) -> Self {
        self.gl_usage = usage;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn alignment(&self) -> u64 {
        self.alignment
    }

    pub fn alignment_multiple(&self) -> u64 {
        self.alignment_multiple
    }

    pub fn sample_offset(&self) -> Numeric {
        self.sample_offset
    }

    pub fn time_range(&self) -> Option<TimeRange> {
        self.time_range
    }

    pub fn gl_usage(&self) -> GlUsage {
        self.gl_usage
    }

    pub fn write_pos(&self) -> WritePos {
        self.write_pos
    }

    pub fn state(&self) -> SeriesState {
        match self.write_pos {
            WritePos::Full => SeriesState::Complete,
            WritePos::At(pos) if pos < self.view_capacity => SeriesState::Filling,
            WritePos::At(_) => SeriesState::Full,
        }
    }

    /// Returns true once no further samples can be written
    pub fn is_full(&self) -> bool {
        self.state() != SeriesState::Filling
    }

    /// Number of samples (records for variable types)
    pub fn len(&self) -> usize {
        if self.data_type.is_variable() {
            self.records().len()
        } else {
            self.valid_extent()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed capacity in samples (bytes for variable types)
    pub fn capacity(&self) -> usize {
        self.view_capacity
    }

    pub fn byte_capacity(&self) -> usize {
        if self.data_type.is_variable() {
            self.view_capacity
        } else {
            self.data_type.density().size(self.view_capacity)
        }
    }

    /// Bytes of valid data
    pub fn byte_length(&self) -> usize {
        self.as_bytes().len()
    }

    /// `[alignment, alignment + len * alignment_multiple)`
    pub fn alignment_bounds(&self) -> Bounds<u64> {
        Bounds::new(
            self.alignment,
            self.alignment
                .saturating_add((self.len() as u64).saturating_mul(self.alignment_multiple)),
        )
    }

    fn valid_extent(&self) -> usize {
        match self.write_pos {
            WritePos::Full => self.view_capacity,
            WritePos::At(pos) => pos,
        }
    }

    fn valid_range(&self) -> Range<usize> {
        self.view_offset..self.view_offset + self.valid_extent()
    }

    /// Raw bytes of the valid region
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.byte_slice(self.valid_range())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Owned copy of the valid region
    pub fn to_buffer(&self) -> SeriesBuffer {
        self.buffer.slice(self.valid_range())
    }

    /// Typed view of the valid samples
    pub fn as_slice<T: NativeSample>(&self) -> Result<&[T]> {
        T::view(&self.buffer)
            .filter(|_| !self.data_type.is_variable())
            .map(|values| &values[self.valid_range()])
            .ok_or_else(|| TelemError::type_mismatch(T::DATA_TYPE, self.data_type))
    }

    pub(crate) fn uuids(&self) -> &[[u8; 16]] {
        match &*self.buffer {
            SeriesBuffer::Uuid(ids) => &ids[self.valid_range()],
            _ => &[],
        }
    }

    /// Record table, built on first use
    fn records(&self) -> &[Range<usize>] {
        self.record_offsets.get_or_init(|| {
            let bytes = self.as_bytes();
            let mut records = Vec::new();
            let mut start = 0;
            for (i, b) in bytes.iter().enumerate() {
                if *b == NEWLINE {
                    records.push(start..i);
                    start = i + 1;
                }
            }
            records
        })
    }

    fn record(&self, index: usize) -> Option<String> {
        let range = self.records().get(index)?.clone();
        Some(String::from_utf8_lossy(&self.as_bytes()[range]).into_owned())
    }

    /// Sample at `index`, with negative indexes counting from the end
    pub fn at(&self, index: i64) -> Option<TelemValue> {
        let index = resolve_index(index, self.len())?;
        self.value_at(index)
    }

    /// Like [`Series::at`], but a miss is a [`TelemError::NotFound`]
    pub fn try_at(&self, index: i64) -> Result<TelemValue> {
        self.at(index).ok_or_else(|| {
            TelemError::NotFound(format!(
                "index {} is out of bounds for series {} of length {}",
                index,
                self.key,
                self.len()
            ))
        })
    }

    /// Sample at a logical alignment
    ///
    /// Only positions that fall exactly on a sample (`(x - alignment) %
    /// alignment_multiple == 0`) inside the alignment bounds have a value.
    pub fn at_alignment(&self, alignment: u64) -> Option<TelemValue> {
        let index = self.index_of_alignment(alignment)?;
        self.value_at(index)
    }

    pub fn try_at_alignment(&self, alignment: u64) -> Result<TelemValue> {
        self.at_alignment(alignment).ok_or_else(|| {
            TelemError::NotFound(format!(
                "no sample at alignment {} in series {} (bounds {}..{}, multiple {})",
                alignment,
                self.key,
                self.alignment,
                self.alignment_bounds().upper,
                self.alignment_multiple
            ))
        })
    }

    fn index_of_alignment(&self, alignment: u64) -> Option<usize> {
        let diff = alignment.checked_sub(self.alignment)?;
        if diff % self.alignment_multiple != 0 {
            return None;
        }
        let index = usize::try_from(diff / self.alignment_multiple).ok()?;
        (index < self.len()).then_some(index)
    }

    pub(crate) fn value_at(&self, index: usize) -> Option<TelemValue> {
        match self.data_type {
            DataType::String => self.record(index).map(TelemValue::String),
            DataType::Json => self.record(index).map(parse_json_record),
            DataType::Uuid => self
                .uuids()
                .get(index)
                .map(|id| TelemValue::String(format_uuid(id))),
            _ => self.numeric_at(index).map(TelemValue::from),
        }
    }

    fn numeric_at(&self, index: usize) -> Option<Numeric> {
        if index >= self.valid_extent() {
            return None;
        }
        self.buffer
            .numeric(self.view_offset + index)
            .map(|n| n.add(self.sample_offset))
    }

    fn require_numeric(&self, operation: &str) -> Result<()> {
        if self.data_type.is_numeric() {
            Ok(())
        } else {
            Err(TelemError::Unsupported(format!(
                "{} is not supported on {} series",
                operation, self.data_type
            )))
        }
    }

    fn require_gl_eligible(&self) -> Result<()> {
        if self.data_type.is_gl_eligible() {
            Ok(())
        } else {
            Err(TelemError::Unsupported(format!(
                "cannot buffer {} series to the gpu",
                self.data_type
            )))
        }
    }

    /// Minimum and maximum sample values, computed once and widened on write
    ///
    /// Timestamp series are assumed sorted: their bounds are the first and
    /// last sample. An empty series has `lower = +inf`, `upper = -inf`.
    pub fn bounds(&self) -> Result<Bounds<Numeric>> {
        self.require_numeric("bounds")?;
        if let Some(cached) = self.cached_bounds.get() {
            return Ok(cached);
        }
        let bounds = raw_bounds(&self.buffer, self.data_type, self.valid_range())
            .map(|raw| offset_bounds(raw, self.sample_offset))
            .unwrap_or(EMPTY_BOUNDS);
        self.cached_bounds.set(Some(bounds));
        Ok(bounds)
    }

    pub fn min(&self) -> Result<Numeric> {
        self.bounds().map(|b| b.lower)
    }

    pub fn max(&self) -> Result<Numeric> {
        self.bounds().map(|b| b.upper)
    }

    /// Append the samples of `other`, returning how many were written
    ///
    /// Writes never grow the buffer: samples past capacity are dropped, and
    /// string/json series only take whole records. Complete and full series
    /// accept the call and return 0.
    pub fn write(&mut self, other: &Series) -> Result<usize> {
        if other.data_type != self.data_type {
            return Err(TelemError::type_mismatch(self.data_type, other.data_type));
        }
        let pos = match self.write_pos {
            WritePos::Full => return Ok(0),
            WritePos::At(pos) => pos,
        };
        let available = self.view_capacity - pos;
        let (written, extent) = if self.data_type.is_variable() {
            self.write_records(other, pos, available)?
        } else {
            self.write_samples(other, pos, available)?
        };
        self.write_pos = WritePos::At(pos + extent);
        Ok(written)
    }

    fn write_samples(&mut self, other: &Series, pos: usize, available: usize) -> Result<(usize, usize)> {
        let count = other.len().min(available);
        if count < other.len() {
            trace!(key = %self.key, dropped = other.len() - count, "series full, truncating write");
        }
        if count == 0 {
            return Ok((0, 0));
        }
        let src = other.view_offset..other.view_offset + count;
        Arc::make_mut(&mut self.buffer).copy_from(self.view_offset + pos, &other.buffer, src.clone())?;
        if let Some(cached) = self.cached_bounds.get() {
            if let Some(raw) = raw_bounds(&other.buffer, other.data_type, src) {
                let appended = offset_bounds(raw, self.sample_offset);
                self.cached_bounds.set(Some(cached.max_combine(appended)));
            }
        }
        Ok((count, count))
    }

    fn write_records(&mut self, other: &Series, pos: usize, available: usize) -> Result<(usize, usize)> {
        let records = other.records();
        let mut bytes = 0;
        let mut count = 0;
        for record in records {
            let size = record.len() + 1;
            if bytes + size > available {
                break;
            }
            bytes += size;
            count += 1;
        }
        if count < records.len() {
            trace!(key = %self.key, dropped = records.len() - count, "series full, truncating write");
        }
        if count == 0 {
            return Ok((0, 0));
        }
        let src = other.view_offset..other.view_offset + bytes;
        Arc::make_mut(&mut self.buffer).copy_from(self.view_offset + pos, &other.buffer, src)?;
        if let Some(offsets) = self.record_offsets.get_mut() {
            offsets.extend(records[..count].iter().map(|r| r.start + pos..r.end + pos));
        }
        Ok((count, bytes))
    }

    /// Owned copy of samples `start..end`
    pub fn slice(&self, start: usize, end: usize) -> Series {
        self.slice_sub(start, end, true)
    }

    /// Zero-copy view of samples `start..end`
    pub fn sub(&self, start: usize, end: usize) -> Series {
        self.slice_sub(start, end, false)
    }

    fn slice_sub(&self, start: usize, end: usize, copy: bool) -> Series {
        let end = end.min(self.len());
        let start = start.min(end);
        let slots = if self.data_type.is_variable() {
            let records = self.records();
            let hi = if end == 0 { 0 } else { records[end - 1].end + 1 };
            let lo = records.get(start).map_or(hi, |r| r.start).min(hi);
            lo..hi
        } else {
            start..end
        };
        let absolute = self.view_offset + slots.start..self.view_offset + slots.end;
        let (buffer, view_offset) = if copy {
            (Arc::new(self.buffer.slice(absolute)), 0)
        } else {
            (Arc::clone(&self.buffer), absolute.start)
        };
        Series {
            key: generate_key(),
            data_type: self.data_type,
            buffer,
            view_offset,
            view_capacity: slots.len(),
            write_pos: WritePos::Full,
            sample_offset: self.sample_offset,
            alignment: self
                .alignment
                .saturating_add((start as u64).saturating_mul(self.alignment_multiple)),
            alignment_multiple: self.alignment_multiple,
            time_range: self.time_range,
            gl_usage: self.gl_usage,
            cached_bounds: Cell::new(None),
            record_offsets: OnceCell::new(),
            gl: GlBufferState::default(),
        }
    }

    /// The same data positioned at a different alignment
    pub fn re_align(&self, alignment: u64) -> Series {
        let mut series = self.clone();
        series.alignment = alignment;
        series
    }

    /// Lower-bound search over sorted numeric samples
    ///
    /// Returns the index of the first sample not less than `value`. The result
    /// is meaningless if the samples are not sorted ascending.
    pub fn binary_search(&self, value: impl Into<Numeric>) -> Result<usize> {
        self.require_numeric("binary search")?;
        let target = value.into();
        let (mut lo, mut hi) = (0, self.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.numeric_at(mid) {
                Some(v) if v < target => lo = mid + 1,
                _ => hi = mid,
            }
        }
        Ok(lo)
    }

    /// Lazy iterator over every sample
    pub fn iter(&self) -> SeriesIter<'_> {
        match self.data_type {
            DataType::String => SeriesIter::String(StringIter::new(self.as_bytes())),
            DataType::Json => SeriesIter::Json(JsonIter::new(self.as_bytes())),
            DataType::Uuid => SeriesIter::Uuid(UuidIter::new(self.uuids())),
            _ => SeriesIter::Fixed(FixedIter::new(
                &self.buffer,
                self.valid_range(),
                self.sample_offset,
            )),
        }
    }

    /// Iterator over samples `start..end`, clamped to the series
    pub fn sub_iter(&self, start: usize, end: usize) -> SubIter<'_> {
        let end = end.min(self.len());
        SubIter::new(self, start.min(end)..end)
    }

    /// Iterator over samples whose alignment lies in `[start, end)`
    pub fn sub_alignment_iter(&self, start: u64, end: u64) -> SubIter<'_> {
        let m = self.alignment_multiple;
        let lo = start.saturating_sub(self.alignment).div_ceil(m);
        let hi = end.saturating_sub(self.alignment).div_ceil(m);
        self.sub_iter(to_index(lo), to_index(hi))
    }

    /// Number of samples whose alignment lies in `[start, end)`
    pub(crate) fn samples_between(&self, start: u64, end: u64) -> u64 {
        let bounds = self.alignment_bounds();
        let lo = start.max(bounds.lower);
        let hi = end.min(bounds.upper);
        if hi <= lo {
            return 0;
        }
        let m = self.alignment_multiple;
        (hi - self.alignment).div_ceil(m) - (lo - self.alignment).div_ceil(m)
    }

    /// Every sample as a string. String and json records are returned verbatim.
    pub fn to_strings(&self) -> Vec<String> {
        if self.data_type.is_variable() {
            let bytes = self.as_bytes();
            return self
                .records()
                .iter()
                .map(|r| String::from_utf8_lossy(&bytes[r.clone()]).into_owned())
                .collect();
        }
        self.iter()
            .map(|v| match v {
                TelemValue::String(s) => s,
                other => other.to_string(),
            })
            .collect()
    }

    /// Deserialize every record of a json series
    pub fn parse_json<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        if self.data_type != DataType::Json {
            return Err(TelemError::type_mismatch(DataType::Json, self.data_type));
        }
        let bytes = self.as_bytes();
        self.records()
            .iter()
            .map(|r| serde_json::from_slice(&bytes[r.clone()]).map_err(TelemError::from))
            .collect()
    }

    pub fn digest(&self) -> SeriesDigest {
        SeriesDigest {
            key: self.key.clone(),
            data_type: self.data_type,
            sample_offset: self.sample_offset.to_string(),
            alignment: self.alignment_bounds(),
            time_range: self.time_range,
            length: self.len(),
            capacity: self.capacity(),
        }
    }

    /// Current GPU reference count
    pub fn ref_count(&self) -> u32 {
        self.gl.ref_count()
    }

    /// Take a GPU reference without uploading
    pub fn acquire(&mut self) -> u32 {
        self.gl.acquire()
    }

    /// Take a GPU reference and bring the GPU copy up to date
    ///
    /// On failure the reference is not taken.
    pub fn acquire_with<C: GlController + ?Sized>(&mut self, gl: &mut C) -> Result<()> {
        self.require_gl_eligible()?;
        self.gl.acquire();
        if let Err(err) = self.update_gl_buffer(gl) {
            self.gl.release(gl);
            return Err(err);
        }
        Ok(())
    }

    /// Drop a GPU reference, deleting the buffer at zero
    pub fn release<C: GlController + ?Sized>(&mut self, gl: &mut C) -> ReleaseOutcome {
        self.gl.release(gl)
    }

    /// Upload whatever was written since the last upload
    ///
    /// Only float32 and uint8 series can be buffered.
    pub fn update_gl_buffer<C: GlController + ?Sized>(&mut self, gl: &mut C) -> Result<()> {
        self.require_gl_eligible()?;
        let upload = Upload {
            write_pos: self.write_pos,
            bytes: self.buffer.byte_slice(self.valid_range()),
            byte_capacity: self.byte_capacity(),
            density: self.data_type.density().bytes(),
            usage: self.gl_usage,
        };
        self.gl.sync(gl, &upload)
    }

    /// Handle of the uploaded GPU buffer
    pub fn gl_buffer(&self) -> Result<GlBufferHandle> {
        let handle = self.gl.handle().ok_or_else(|| {
            TelemError::Gl(format!("gl buffer for series {} has not been initialized", self.key))
        })?;
        if self.gl.uploaded() != Some(self.write_pos) {
            warn!(key = %self.key, "gl buffer is out of date with series contents");
        }
        Ok(handle)
    }
}

impl Clone for Series {
    /// Shares the buffer. The clone starts with no GPU buffer of its own.
    fn clone(&self) -> Self {
        Series {
            key: self.key.clone(),
            data_type: self.data_type,
            buffer: Arc::clone(&self.buffer),
            view_offset: self.view_offset,
            view_capacity: self.view_capacity,
            write_pos: self.write_pos,
            sample_offset: self.sample_offset,
            alignment: self.alignment,
            alignment_multiple: self.alignment_multiple,
            time_range: self.time_range,
            gl_usage: self.gl_usage,
            cached_bounds: Cell::new(self.cached_bounds.get()),
            record_offsets: self.record_offsets.clone(),
            gl: GlBufferState::default(),
        }
    }
}

impl<T: NativeSample> From<Vec<T>> for Series {
    fn from(values: Vec<T>) -> Self {
        Series::from_buffer(T::wrap(values), T::DATA_TYPE)
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = TelemValue;
    type IntoIter = SeriesIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.len();
        write!(f, "Series(type: {}, len: {}, cap: {}, data: [", self.data_type, len, self.capacity())?;
        let values: Vec<String> = if len <= 6 {
            self.iter().map(|v| v.to_string()).collect()
        } else {
            let head = self.sub_iter(0, 3).map(|v| v.to_string());
            let tail = self.sub_iter(len - 3, len).map(|v| v.to_string());
            head.chain(std::iter::once("...".to_string())).chain(tail).collect()
        };
        write!(f, "{}])", values.join(" "))
    }
}

/// Resolve a possibly negative index against `len`
pub(crate) fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { len + index } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

fn to_index(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

/// Unbiased bounds of `range`; first/last for timestamps
fn raw_bounds(buffer: &SeriesBuffer, data_type: DataType, range: Range<usize>) -> Option<Bounds<Numeric>> {
    if range.is_empty() {
        return None;
    }
    if data_type == DataType::TimeStamp {
        let first = buffer.numeric(range.start)?;
        let last = buffer.numeric(range.end - 1)?;
        return Some(Bounds::new(first, last));
    }
    buffer.min_max(range).map(|(lo, hi)| Bounds::new(lo, hi))
}

fn offset_bounds(raw: Bounds<Numeric>, offset: Numeric) -> Bounds<Numeric> {
    Bounds::new(raw.lower.add(offset), raw.upper.add(offset))
}

fn encode_record(out: &mut Vec<u8>, value: &TelemValue, data_type: DataType) -> Result<()> {
    let record = match (data_type, value) {
        (DataType::Json, value) => serde_json::to_string(&value.to_json())?,
        (_, TelemValue::String(s)) => s.clone(),
        (_, other) => other.to_string(),
    };
    if record.as_bytes().contains(&NEWLINE) {
        return Err(TelemError::Construction(format!(
            "record {:?} contains the newline delimiter",
            record
        )));
    }
    out.extend_from_slice(record.as_bytes());
    out.push(NEWLINE);
    Ok(())
}

pub(crate) fn parse_json_record(record: String) -> TelemValue {
    match serde_json::from_str(&record) {
        Ok(value) => TelemValue::Json(value),
        Err(err) => {
            warn!(%err, "failed to parse json record");
            TelemValue::String(record)
        }
    }
}
