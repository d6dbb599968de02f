//! Typed storage behind a series
//!
//! [`SeriesBuffer`] is a tagged union of owned vectors, one variant per
//! physical layout. The variant is chosen from the data type at construction,
//! so a float series can never be read through an integer view.
//!
//! Variable-length types (string, json) share the [`SeriesBuffer::Variable`]
//! layout: UTF-8 records, each terminated by a single `\n` byte. UUIDs are
//! stored as 16-byte big-endian records.

use crate::error::{Result, TelemError};
use crate::types::{DataType, Numeric};
use std::fmt;
use std::ops::Range;

/// Record terminator for variable-length types
pub const NEWLINE: u8 = b'\n';

/// Owned, typed sample storage
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesBuffer {
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Uint8(Vec<u8>),
    Uint16(Vec<u16>),
    Uint32(Vec<u32>),
    Uint64(Vec<u64>),
    TimeStamp(Vec<i64>),
    Uuid(Vec<[u8; 16]>),
    Variable(Vec<u8>),
}

/// Runs `$body` with `$v` bound to the inner vector of any variant.
macro_rules! each_variant {
    ($buf:expr, $v:ident => $body:expr) => {
        match $buf {
            SeriesBuffer::Float32($v) => $body,
            SeriesBuffer::Float64($v) => $body,
            SeriesBuffer::Int8($v) => $body,
            SeriesBuffer::Int16($v) => $body,
            SeriesBuffer::Int32($v) => $body,
            SeriesBuffer::Int64($v) => $body,
            SeriesBuffer::Uint8($v) => $body,
            SeriesBuffer::Uint16($v) => $body,
            SeriesBuffer::Uint32($v) => $body,
            SeriesBuffer::Uint64($v) => $body,
            SeriesBuffer::TimeStamp($v) => $body,
            SeriesBuffer::Uuid($v) => $body,
            SeriesBuffer::Variable($v) => $body,
        }
    };
}

/// Like `each_variant!`, but re-wraps the result in the same variant.
macro_rules! map_variant {
    ($buf:expr, $v:ident => $body:expr) => {
        match $buf {
            SeriesBuffer::Float32($v) => SeriesBuffer::Float32($body),
            SeriesBuffer::Float64($v) => SeriesBuffer::Float64($body),
            SeriesBuffer::Int8($v) => SeriesBuffer::Int8($body),
            SeriesBuffer::Int16($v) => SeriesBuffer::Int16($body),
            SeriesBuffer::Int32($v) => SeriesBuffer::Int32($body),
            SeriesBuffer::Int64($v) => SeriesBuffer::Int64($body),
            SeriesBuffer::Uint8($v) => SeriesBuffer::Uint8($body),
            SeriesBuffer::Uint16($v) => SeriesBuffer::Uint16($body),
            SeriesBuffer::Uint32($v) => SeriesBuffer::Uint32($body),
            SeriesBuffer::Uint64($v) => SeriesBuffer::Uint64($body),
            SeriesBuffer::TimeStamp($v) => SeriesBuffer::TimeStamp($body),
            SeriesBuffer::Uuid($v) => SeriesBuffer::Uuid($body),
            SeriesBuffer::Variable($v) => SeriesBuffer::Variable($body),
        }
    };
}

/// Runs `$body` for the fixed numeric variants, `$other` for the rest.
macro_rules! each_numeric {
    ($buf:expr, $v:ident => $body:expr, _ => $other:expr) => {
        match $buf {
            SeriesBuffer::Float32($v) => $body,
            SeriesBuffer::Float64($v) => $body,
            SeriesBuffer::Int8($v) => $body,
            SeriesBuffer::Int16($v) => $body,
            SeriesBuffer::Int32($v) => $body,
            SeriesBuffer::Int64($v) | SeriesBuffer::TimeStamp($v) => $body,
            SeriesBuffer::Uint8($v) => $body,
            SeriesBuffer::Uint16($v) => $body,
            SeriesBuffer::Uint32($v) => $body,
            SeriesBuffer::Uint64($v) => $body,
            SeriesBuffer::Uuid(_) | SeriesBuffer::Variable(_) => $other,
        }
    };
}

/// Runs `$body` when both buffers share a variant, `$other` otherwise.
macro_rules! zip_variant {
    ($a:expr, $b:expr, ($x:ident, $y:ident) => $body:expr, _ => $other:expr) => {
        match ($a, $b) {
            (SeriesBuffer::Float32($x), SeriesBuffer::Float32($y)) => $body,
            (SeriesBuffer::Float64($x), SeriesBuffer::Float64($y)) => $body,
            (SeriesBuffer::Int8($x), SeriesBuffer::Int8($y)) => $body,
            (SeriesBuffer::Int16($x), SeriesBuffer::Int16($y)) => $body,
            (SeriesBuffer::Int32($x), SeriesBuffer::Int32($y)) => $body,
            (SeriesBuffer::Int64($x), SeriesBuffer::Int64($y)) => $body,
            (SeriesBuffer::Uint8($x), SeriesBuffer::Uint8($y)) => $body,
            (SeriesBuffer::Uint16($x), SeriesBuffer::Uint16($y)) => $body,
            (SeriesBuffer::Uint32($x), SeriesBuffer::Uint32($y)) => $body,
            (SeriesBuffer::Uint64($x), SeriesBuffer::Uint64($y)) => $body,
            (SeriesBuffer::TimeStamp($x), SeriesBuffer::TimeStamp($y)) => $body,
            (SeriesBuffer::Uuid($x), SeriesBuffer::Uuid($y)) => $body,
            (SeriesBuffer::Variable($x), SeriesBuffer::Variable($y)) => $body,
            _ => $other,
        }
    };
}

/// A primitive that can be stored in a fixed-width numeric series
pub trait NativeSample: bytemuck::Pod + PartialOrd + fmt::Debug + Send + Sync + 'static {
    /// Data type of a series built from a `Vec<Self>`
    const DATA_TYPE: DataType;

    fn to_numeric(self) -> Numeric;

    /// Lossy conversion; out-of-range values saturate
    fn from_numeric(n: Numeric) -> Self;

    fn wrap(values: Vec<Self>) -> SeriesBuffer;

    /// Typed view of a buffer, if it stores `Self`
    fn view(buffer: &SeriesBuffer) -> Option<&[Self]>;
}

macro_rules! impl_native_number {
    ($t:ty, $variant:ident) => {
        impl NativeSample for $t {
            const DATA_TYPE: DataType = DataType::$variant;

            fn to_numeric(self) -> Numeric {
                Numeric::Number(self as f64)
            }

            fn from_numeric(n: Numeric) -> Self {
                match n {
                    Numeric::Number(v) => v as $t,
                    // float casts saturate, integer casts would wrap
                    Numeric::BigInt(v) => v as f64 as $t,
                }
            }

            fn wrap(values: Vec<Self>) -> SeriesBuffer {
                SeriesBuffer::$variant(values)
            }

            fn view(buffer: &SeriesBuffer) -> Option<&[Self]> {
                match buffer {
                    SeriesBuffer::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_native_number!(f32, Float32);
impl_native_number!(f64, Float64);
impl_native_number!(i8, Int8);
impl_native_number!(i16, Int16);
impl_native_number!(i32, Int32);
impl_native_number!(u8, Uint8);
impl_native_number!(u16, Uint16);
impl_native_number!(u32, Uint32);

impl NativeSample for i64 {
    const DATA_TYPE: DataType = DataType::Int64;

    fn to_numeric(self) -> Numeric {
        Numeric::BigInt(self as i128)
    }

    fn from_numeric(n: Numeric) -> Self {
        match n {
            Numeric::Number(v) => v as i64,
            Numeric::BigInt(v) => v.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
        }
    }

    fn wrap(values: Vec<Self>) -> SeriesBuffer {
        SeriesBuffer::Int64(values)
    }

    // Timestamps are stored as i64 nanoseconds and share this view.
    fn view(buffer: &SeriesBuffer) -> Option<&[Self]> {
        match buffer {
            SeriesBuffer::Int64(v) | SeriesBuffer::TimeStamp(v) => Some(v),
            _ => None,
        }
    }
}

impl NativeSample for u64 {
    const DATA_TYPE: DataType = DataType::Uint64;

    fn to_numeric(self) -> Numeric {
        Numeric::BigInt(self as i128)
    }

    fn from_numeric(n: Numeric) -> Self {
        match n {
            Numeric::Number(v) => v as u64,
            Numeric::BigInt(v) => v.clamp(0, u64::MAX as i128) as u64,
        }
    }

    fn wrap(values: Vec<Self>) -> SeriesBuffer {
        SeriesBuffer::Uint64(values)
    }

    fn view(buffer: &SeriesBuffer) -> Option<&[Self]> {
        match buffer {
            SeriesBuffer::Uint64(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: NativeSample> From<Vec<T>> for SeriesBuffer {
    fn from(values: Vec<T>) -> Self {
        T::wrap(values)
    }
}

impl SeriesBuffer {
    /// A zero-filled buffer holding `capacity` samples (bytes for variable types)
    pub fn zeroed(data_type: DataType, capacity: usize) -> Result<Self> {
        Ok(match data_type {
            DataType::Float32 => SeriesBuffer::Float32(vec![0.0; capacity]),
            DataType::Float64 => SeriesBuffer::Float64(vec![0.0; capacity]),
            DataType::Int8 => SeriesBuffer::Int8(vec![0; capacity]),
            DataType::Int16 => SeriesBuffer::Int16(vec![0; capacity]),
            DataType::Int32 => SeriesBuffer::Int32(vec![0; capacity]),
            DataType::Int64 => SeriesBuffer::Int64(vec![0; capacity]),
            DataType::Uint8 => SeriesBuffer::Uint8(vec![0; capacity]),
            DataType::Uint16 => SeriesBuffer::Uint16(vec![0; capacity]),
            DataType::Uint32 => SeriesBuffer::Uint32(vec![0; capacity]),
            DataType::Uint64 => SeriesBuffer::Uint64(vec![0; capacity]),
            DataType::TimeStamp => SeriesBuffer::TimeStamp(vec![0; capacity]),
            DataType::Uuid => SeriesBuffer::Uuid(vec![[0; 16]; capacity]),
            DataType::String | DataType::Json => SeriesBuffer::Variable(vec![0; capacity]),
            DataType::Unknown => {
                return Err(TelemError::Construction(
                    "cannot allocate a buffer of unknown data type".to_string(),
                ))
            }
        })
    }

    /// Interprets native-endian bytes as samples of `data_type`
    ///
    /// Fixed-width types require a byte length that is a multiple of the
    /// density. A variable-length payload missing its final delimiter gets one
    /// appended.
    pub fn from_bytes(data_type: DataType, bytes: &[u8]) -> Result<Self> {
        let density = data_type.density();
        if data_type == DataType::Unknown {
            return Err(TelemError::Construction(
                "cannot interpret bytes as unknown data type".to_string(),
            ));
        }
        if data_type.is_variable() {
            let mut data = bytes.to_vec();
            if data.last().is_some_and(|b| *b != NEWLINE) {
                data.push(NEWLINE);
            }
            return Ok(SeriesBuffer::Variable(data));
        }
        if bytes.len() % density.bytes() != 0 {
            return Err(TelemError::Construction(format!(
                "byte length {} is not a multiple of {} density ({})",
                bytes.len(),
                data_type,
                density
            )));
        }
        Ok(match data_type {
            DataType::Float32 => SeriesBuffer::Float32(bytemuck::pod_collect_to_vec(bytes)),
            DataType::Float64 => SeriesBuffer::Float64(bytemuck::pod_collect_to_vec(bytes)),
            DataType::Int8 => SeriesBuffer::Int8(bytemuck::pod_collect_to_vec(bytes)),
            DataType::Int16 => SeriesBuffer::Int16(bytemuck::pod_collect_to_vec(bytes)),
            DataType::Int32 => SeriesBuffer::Int32(bytemuck::pod_collect_to_vec(bytes)),
            DataType::Int64 => SeriesBuffer::Int64(bytemuck::pod_collect_to_vec(bytes)),
            DataType::Uint8 => SeriesBuffer::Uint8(bytes.to_vec()),
            DataType::Uint16 => SeriesBuffer::Uint16(bytemuck::pod_collect_to_vec(bytes)),
            DataType::Uint32 => SeriesBuffer::Uint32(bytemuck::pod_collect_to_vec(bytes)),
            DataType::Uint64 => SeriesBuffer::Uint64(bytemuck::pod_collect_to_vec(bytes)),
            DataType::TimeStamp => SeriesBuffer::TimeStamp(bytemuck::pod_collect_to_vec(bytes)),
            DataType::Uuid => SeriesBuffer::Uuid(bytemuck::pod_collect_to_vec(bytes)),
            DataType::String | DataType::Json | DataType::Unknown => {
                return Err(TelemError::Construction(format!(
                    "cannot interpret bytes as {}",
                    data_type
                )))
            }
        })
    }

    /// Builds a fixed-width numeric buffer, converting each value with saturation
    pub fn from_numerics(data_type: DataType, values: &[Numeric]) -> Result<Self> {
        fn collect<T: NativeSample>(values: &[Numeric]) -> Vec<T> {
            values.iter().map(|n| T::from_numeric(*n)).collect()
        }
        Ok(match data_type {
            DataType::Float32 => SeriesBuffer::Float32(collect(values)),
            DataType::Float64 => SeriesBuffer::Float64(collect(values)),
            DataType::Int8 => SeriesBuffer::Int8(collect(values)),
            DataType::Int16 => SeriesBuffer::Int16(collect(values)),
            DataType::Int32 => SeriesBuffer::Int32(collect(values)),
            DataType::Int64 => SeriesBuffer::Int64(collect(values)),
            DataType::Uint8 => SeriesBuffer::Uint8(collect(values)),
            DataType::Uint16 => SeriesBuffer::Uint16(collect(values)),
            DataType::Uint32 => SeriesBuffer::Uint32(collect(values)),
            DataType::Uint64 => SeriesBuffer::Uint64(collect(values)),
            DataType::TimeStamp => SeriesBuffer::TimeStamp(collect(values)),
            other => {
                return Err(TelemError::Unsupported(format!(
                    "{} is not a fixed-width numeric data type",
                    other
                )))
            }
        })
    }

    /// The data type this layout stores natively (string for variable buffers)
    pub fn natural_data_type(&self) -> DataType {
        match self {
            SeriesBuffer::Float32(_) => DataType::Float32,
            SeriesBuffer::Float64(_) => DataType::Float64,
            SeriesBuffer::Int8(_) => DataType::Int8,
            SeriesBuffer::Int16(_) => DataType::Int16,
            SeriesBuffer::Int32(_) => DataType::Int32,
            SeriesBuffer::Int64(_) => DataType::Int64,
            SeriesBuffer::Uint8(_) => DataType::Uint8,
            SeriesBuffer::Uint16(_) => DataType::Uint16,
            SeriesBuffer::Uint32(_) => DataType::Uint32,
            SeriesBuffer::Uint64(_) => DataType::Uint64,
            SeriesBuffer::TimeStamp(_) => DataType::TimeStamp,
            SeriesBuffer::Uuid(_) => DataType::Uuid,
            SeriesBuffer::Variable(_) => DataType::String,
        }
    }

    /// Returns true if this layout can back a series of `data_type`
    pub fn stores(&self, data_type: DataType) -> bool {
        match self {
            SeriesBuffer::Variable(_) => data_type.is_variable(),
            other => other.natural_data_type() == data_type,
        }
    }

    /// Number of slots (bytes for variable buffers)
    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw bytes of the slots in `range`
    pub fn byte_slice(&self, range: Range<usize>) -> &[u8] {
        each_variant!(self, v => bytemuck::cast_slice(&v[range]))
    }

    /// Raw bytes of the whole buffer
    pub fn as_bytes(&self) -> &[u8] {
        self.byte_slice(0..self.len())
    }

    /// Numeric value of slot `index`, without any sample offset
    pub fn numeric(&self, index: usize) -> Option<Numeric> {
        each_numeric!(self, v => v.get(index).map(|x| x.to_numeric()), _ => None)
    }

    /// Bytes of a variable-length buffer
    pub fn variable_bytes(&self) -> Option<&[u8]> {
        match self {
            SeriesBuffer::Variable(v) => Some(v),
            _ => None,
        }
    }

    /// Owned copy of the slots in `range`
    pub fn slice(&self, range: Range<usize>) -> SeriesBuffer {
        map_variant!(self, v => v[range].to_vec())
    }

    /// Overwrites slots starting at `at` with `src[range]`
    pub fn copy_from(&mut self, at: usize, src: &SeriesBuffer, range: Range<usize>) -> Result<()> {
        let expected = self.natural_data_type();
        let actual = src.natural_data_type();
        zip_variant!(self, src, (dst, s) => {
            let count = range.len();
            dst[at..at + count].copy_from_slice(&s[range]);
            Ok(())
        }, _ => Err(TelemError::type_mismatch(expected, actual)))
    }

    /// Appends `src[range]` to the end of this buffer
    pub fn extend_from(&mut self, src: &SeriesBuffer, range: Range<usize>) -> Result<()> {
        let expected = self.natural_data_type();
        let actual = src.natural_data_type();
        zip_variant!(self, src, (dst, s) => {
            dst.extend_from_slice(&s[range]);
            Ok(())
        }, _ => Err(TelemError::type_mismatch(expected, actual)))
    }

    /// Minimum and maximum of the numeric slots in `range`, skipping NaN
    pub fn min_max(&self, range: Range<usize>) -> Option<(Numeric, Numeric)> {
        each_numeric!(self, v => {
            let mut iter = v[range].iter().copied().filter(|x| x.partial_cmp(x).is_some());
            let first = iter.next()?;
            let (min, max) = iter.fold((first, first), |(lo, hi), x| {
                (if x < lo { x } else { lo }, if x > hi { x } else { hi })
            });
            Some((min.to_numeric(), max.to_numeric()))
        }, _ => None)
    }
}

/// Formats a 16-byte big-endian UUID as `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`
pub fn format_uuid(bytes: &[u8; 16]) -> String {
    let mut out = String::with_capacity(36);
    for (i, b) in bytes.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Parses the canonical (or undashed) hex form of a UUID
pub fn parse_uuid(s: &str) -> Result<[u8; 16]> {
    let hex: Vec<u8> = s.bytes().filter(|b| *b != b'-').collect();
    if hex.len() != 32 {
        return Err(TelemError::Construction(format!("invalid uuid '{}'", s)));
    }
    let mut out = [0u8; 16];
    for (i, pair) in hex.chunks_exact(2).enumerate() {
        let digits = std::str::from_utf8(pair)
            .map_err(|_| TelemError::Construction(format!("invalid uuid '{}'", s)))?;
        out[i] = u8::from_str_radix(digits, 16)
            .map_err(|_| TelemError::Construction(format!("invalid uuid '{}'", s)))?;
    }
    Ok(out)
}
