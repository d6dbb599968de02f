//! Core value tags and scalar types for telem-rs
//!
//! This module contains the small, copyable types that every other part of the
//! engine is built on.
//!
//! # Main Types
//!
//! - [`DataType`] - Closed enum of physical sample encodings (float32, timestamp, json, ...)
//! - [`Density`] - Fixed byte width of a data type, or the variable-length marker
//! - [`Numeric`] - A number-or-bigint scalar used for statistics, offsets and searches
//! - [`TelemValue`] - A single sample as supplied to or read from a series
//! - [`Bounds`] - A `[lower, upper)` pair used for alignment and value ranges
//!
//! # Big integers
//!
//! Int64, Uint64 and TimeStamp samples are read as [`Numeric::BigInt`] so that no
//! precision is lost; every other fixed numeric type is read as
//! [`Numeric::Number`]. `i128` covers the full range of both 64-bit integer types.

use crate::error::TelemError;
use crate::time::TimeStamp;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Physical encoding of the samples in a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Unknown or invalid type (the data type of an empty collection)
    #[default]
    Unknown,
    /// 64-bit floating point
    Float64,
    /// 32-bit floating point
    Float32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit signed integer
    Int32,
    /// 16-bit signed integer
    Int16,
    /// 8-bit signed integer
    Int8,
    /// 64-bit unsigned integer
    Uint64,
    /// 32-bit unsigned integer
    Uint32,
    /// 16-bit unsigned integer
    Uint16,
    /// 8-bit unsigned integer (also used for booleans)
    Uint8,
    /// Nanoseconds since the unix epoch, stored as i64
    TimeStamp,
    /// 16-byte big-endian UUID
    Uuid,
    /// Newline-terminated UTF-8 records
    String,
    /// Newline-terminated JSON documents
    Json,
}

impl DataType {
    /// Booleans are stored as one byte per sample.
    pub const BOOLEAN: DataType = DataType::Uint8;

    /// Every data type, including [`DataType::Unknown`]
    pub const ALL: [DataType; 15] = [
        DataType::Unknown,
        DataType::Float64,
        DataType::Float32,
        DataType::Int64,
        DataType::Int32,
        DataType::Int16,
        DataType::Int8,
        DataType::Uint64,
        DataType::Uint32,
        DataType::Uint16,
        DataType::Uint8,
        DataType::TimeStamp,
        DataType::Uuid,
        DataType::String,
        DataType::Json,
    ];

    /// Returns the tag string used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Unknown => "unknown",
            DataType::Float64 => "float64",
            DataType::Float32 => "float32",
            DataType::Int64 => "int64",
            DataType::Int32 => "int32",
            DataType::Int16 => "int16",
            DataType::Int8 => "int8",
            DataType::Uint64 => "uint64",
            DataType::Uint32 => "uint32",
            DataType::Uint16 => "uint16",
            DataType::Uint8 => "uint8",
            DataType::TimeStamp => "timestamp",
            DataType::Uuid => "uuid",
            DataType::String => "string",
            DataType::Json => "json",
        }
    }

    /// Returns the byte width of a single sample
    pub fn density(&self) -> Density {
        match self {
            DataType::Uint8 | DataType::Int8 => Density::BIT8,
            DataType::Uint16 | DataType::Int16 => Density::BIT16,
            DataType::Uint32 | DataType::Int32 | DataType::Float32 => Density::BIT32,
            DataType::Uint64 | DataType::Int64 | DataType::Float64 | DataType::TimeStamp => {
                Density::BIT64
            }
            DataType::Uuid => Density::BIT128,
            DataType::String | DataType::Json | DataType::Unknown => Density::UNKNOWN,
        }
    }

    /// Returns true for newline-delimited record types (string, json)
    pub fn is_variable(&self) -> bool {
        matches!(self, DataType::String | DataType::Json)
    }

    /// Returns true for types whose samples can be read as numbers
    pub fn is_numeric(&self) -> bool {
        !self.is_variable() && !matches!(self, DataType::Uuid | DataType::Unknown)
    }

    /// Returns true for the signed integer types
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    /// Returns true for the floating point types
    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// Returns true for types read as [`Numeric::BigInt`]
    pub fn uses_big_int(&self) -> bool {
        matches!(self, DataType::Int64 | DataType::Uint64 | DataType::TimeStamp)
    }

    /// Returns true for the two types that can be uploaded to a GPU buffer
    pub fn is_gl_eligible(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Uint8)
    }

    /// Returns true if values of this type fit in `other` without loss of precision
    pub fn can_safely_cast_to(&self, other: DataType) -> bool {
        if *self == other {
            return true;
        }
        if self.is_variable() != other.is_variable() {
            return false;
        }
        if (self.is_float() && other.is_integer()) || (self.is_integer() && other.is_float()) {
            return self.density() < other.density();
        }
        if (self.is_float() && other.is_float()) || (self.is_integer() && other.is_integer()) {
            return self.density() <= other.density();
        }
        false
    }

    /// Returns true if values of this type can be converted to `other`, even lossily
    pub fn can_cast_to(&self, other: DataType) -> bool {
        if self.is_numeric() && other.is_numeric() {
            return true;
        }
        *self == other
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DataType {
    type Err = TelemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .iter()
            .copied()
            .find(|dt| dt.as_str() == s)
            .ok_or_else(|| TelemError::Construction(format!("unknown data type '{}'", s)))
    }
}

/// Number of bytes occupied by one sample
///
/// A density of zero marks a variable-length type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Density(usize);

impl Density {
    /// Unknown or variable density
    pub const UNKNOWN: Density = Density(0);
    /// 8 bits per value
    pub const BIT8: Density = Density(1);
    /// 16 bits per value
    pub const BIT16: Density = Density(2);
    /// 32 bits per value
    pub const BIT32: Density = Density(4);
    /// 64 bits per value
    pub const BIT64: Density = Density(8);
    /// 128 bits per value
    pub const BIT128: Density = Density(16);

    pub const fn new(bytes: usize) -> Self {
        Density(bytes)
    }

    /// Bytes per sample
    pub fn bytes(&self) -> usize {
        self.0
    }

    pub fn is_variable(&self) -> bool {
        self.0 == 0
    }

    /// Number of bytes occupied by `samples` samples
    pub fn size(&self, samples: usize) -> usize {
        samples * self.0
    }

    /// Number of whole samples in `bytes` bytes
    pub fn length(&self, bytes: usize) -> usize {
        if self.0 == 0 {
            0
        } else {
            bytes / self.0
        }
    }
}

impl fmt::Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_variable() {
            write!(f, "variable")
        } else {
            write!(f, "{} bytes", self.0)
        }
    }
}

/// A number-or-bigint scalar
///
/// Comparisons between the two kinds happen in `f64` space; comparisons between
/// two big integers are exact.
#[derive(Debug, Clone, Copy)]
pub enum Numeric {
    /// A value read from a float, 8/16/32-bit integer or boolean series
    Number(f64),
    /// A value read from an int64, uint64 or timestamp series
    BigInt(i128),
}

impl Numeric {
    pub const ZERO: Numeric = Numeric::Number(0.0);

    pub fn as_f64(&self) -> f64 {
        match self {
            Numeric::Number(v) => *v,
            Numeric::BigInt(v) => *v as f64,
        }
    }

    /// Truncates numbers toward zero
    pub fn as_i128(&self) -> i128 {
        match self {
            Numeric::Number(v) => v.trunc() as i128,
            Numeric::BigInt(v) => *v,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Numeric::Number(v) => *v == 0.0,
            Numeric::BigInt(v) => *v == 0,
        }
    }

    /// Adds `other`, keeping the kind of `self`
    pub fn add(self, other: Numeric) -> Numeric {
        match self {
            Numeric::Number(v) => Numeric::Number(v + other.as_f64()),
            Numeric::BigInt(v) => Numeric::BigInt(v.saturating_add(other.as_i128())),
        }
    }

    /// Subtracts `other`, keeping the kind of `self`
    pub fn sub(self, other: Numeric) -> Numeric {
        match self {
            Numeric::Number(v) => Numeric::Number(v - other.as_f64()),
            Numeric::BigInt(v) => Numeric::BigInt(v.saturating_sub(other.as_i128())),
        }
    }
}

impl Default for Numeric {
    fn default() -> Self {
        Numeric::ZERO
    }
}

impl PartialEq for Numeric {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Numeric::BigInt(a), Numeric::BigInt(b)) => Some(a.cmp(b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Number(v) => write!(f, "{}", v),
            Numeric::BigInt(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for Numeric {
    fn from(v: f64) -> Self {
        Numeric::Number(v)
    }
}

impl From<f32> for Numeric {
    fn from(v: f32) -> Self {
        Numeric::Number(v as f64)
    }
}

impl From<i32> for Numeric {
    fn from(v: i32) -> Self {
        Numeric::Number(v as f64)
    }
}

impl From<i64> for Numeric {
    fn from(v: i64) -> Self {
        Numeric::BigInt(v as i128)
    }
}

impl From<u64> for Numeric {
    fn from(v: u64) -> Self {
        Numeric::BigInt(v as i128)
    }
}

impl From<i128> for Numeric {
    fn from(v: i128) -> Self {
        Numeric::BigInt(v)
    }
}

impl From<TimeStamp> for Numeric {
    fn from(ts: TimeStamp) -> Self {
        Numeric::BigInt(ts.nanos() as i128)
    }
}

/// A single telemetry sample
///
/// Used both as construction input (where the variant drives data type
/// inference) and as the result of reading a series. UUID samples are read as
/// their canonical string form.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemValue {
    Number(f64),
    BigInt(i128),
    Bool(bool),
    TimeStamp(TimeStamp),
    String(String),
    Json(serde_json::Value),
}

impl TelemValue {
    /// The data type a series built from this value would have
    pub fn inferred_data_type(&self) -> DataType {
        match self {
            TelemValue::String(_) => DataType::String,
            TelemValue::Number(_) => DataType::Float64,
            TelemValue::BigInt(_) => DataType::Int64,
            TelemValue::Bool(_) => DataType::BOOLEAN,
            TelemValue::TimeStamp(_) => DataType::TimeStamp,
            TelemValue::Json(_) => DataType::Json,
        }
    }

    /// Numeric view of the value, if it has one
    pub fn as_numeric(&self) -> Option<Numeric> {
        match self {
            TelemValue::Number(v) => Some(Numeric::Number(*v)),
            TelemValue::BigInt(v) => Some(Numeric::BigInt(*v)),
            TelemValue::Bool(b) => Some(Numeric::Number(if *b { 1.0 } else { 0.0 })),
            TelemValue::TimeStamp(ts) => Some(Numeric::from(*ts)),
            TelemValue::String(_) | TelemValue::Json(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_numeric().map(|n| n.as_f64())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TelemValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// JSON form of the value. Non-finite numbers become `null`; big integers
    /// outside the 64-bit range fall back to a float.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            TelemValue::Number(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            TelemValue::BigInt(v) => i64::try_from(*v)
                .map(Value::from)
                .or_else(|_| u64::try_from(*v).map(Value::from))
                .unwrap_or_else(|_| Value::from(*v as f64)),
            TelemValue::Bool(b) => Value::Bool(*b),
            TelemValue::TimeStamp(ts) => Value::from(ts.nanos()),
            TelemValue::String(s) => Value::String(s.clone()),
            TelemValue::Json(v) => v.clone(),
        }
    }

    /// Converts a JSON value into a sample destined for a series of `data_type`
    pub fn from_json(value: serde_json::Value, data_type: DataType) -> TelemValue {
        use serde_json::Value;
        if data_type == DataType::Json {
            return TelemValue::Json(value);
        }
        match value {
            Value::String(s) => TelemValue::String(s),
            Value::Bool(b) => TelemValue::Bool(b),
            Value::Number(n) if data_type.uses_big_int() => n
                .as_i64()
                .map(|v| TelemValue::BigInt(v as i128))
                .or_else(|| n.as_u64().map(|v| TelemValue::BigInt(v as i128)))
                .unwrap_or_else(|| TelemValue::Number(n.as_f64().unwrap_or(f64::NAN))),
            Value::Number(n) => TelemValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            other => TelemValue::Json(other),
        }
    }
}

impl fmt::Display for TelemValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemValue::Number(v) => write!(f, "{}", v),
            TelemValue::BigInt(v) => write!(f, "{}", v),
            TelemValue::Bool(b) => write!(f, "{}", b),
            TelemValue::TimeStamp(ts) => write!(f, "{}", ts),
            TelemValue::String(s) => write!(f, "{}", s),
            TelemValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<Numeric> for TelemValue {
    fn from(n: Numeric) -> Self {
        match n {
            Numeric::Number(v) => TelemValue::Number(v),
            Numeric::BigInt(v) => TelemValue::BigInt(v),
        }
    }
}

impl From<f64> for TelemValue {
    fn from(v: f64) -> Self {
        TelemValue::Number(v)
    }
}

impl From<i64> for TelemValue {
    fn from(v: i64) -> Self {
        TelemValue::BigInt(v as i128)
    }
}

impl From<bool> for TelemValue {
    fn from(v: bool) -> Self {
        TelemValue::Bool(v)
    }
}

impl From<&str> for TelemValue {
    fn from(v: &str) -> Self {
        TelemValue::String(v.to_string())
    }
}

impl From<String> for TelemValue {
    fn from(v: String) -> Self {
        TelemValue::String(v)
    }
}

impl From<TimeStamp> for TelemValue {
    fn from(ts: TimeStamp) -> Self {
        TelemValue::TimeStamp(ts)
    }
}

impl From<serde_json::Value> for TelemValue {
    fn from(v: serde_json::Value) -> Self {
        TelemValue::Json(v)
    }
}

/// A `[lower, upper)` pair
///
/// Alignment bounds use the half-open interpretation; value bounds returned by
/// [`crate::Series::bounds`] hold the inclusive minimum and maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub lower: T,
    pub upper: T,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    pub fn new(lower: T, upper: T) -> Self {
        Self { lower, upper }
    }

    /// Returns true if `lower <= value < upper`
    pub fn contains(&self, value: T) -> bool {
        value >= self.lower && value < self.upper
    }

    pub fn is_empty(&self) -> bool {
        !(self.lower < self.upper)
    }

    /// Smallest bounds enclosing both `self` and `other`
    pub fn max_combine(self, other: Bounds<T>) -> Bounds<T> {
        let lower = if other.lower < self.lower {
            other.lower
        } else {
            self.lower
        };
        let upper = if other.upper > self.upper {
            other.upper
        } else {
            self.upper
        };
        Bounds { lower, upper }
    }
}

impl Bounds<u64> {
    /// Number of positions covered
    pub fn span(&self) -> u64 {
        self.upper.saturating_sub(self.lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_density() {
        assert_eq!(DataType::Uint8.density().bytes(), 1);
        assert_eq!(DataType::Int16.density().bytes(), 2);
        assert_eq!(DataType::Float32.density().bytes(), 4);
        assert_eq!(DataType::TimeStamp.density().bytes(), 8);
        assert_eq!(DataType::Uuid.density().bytes(), 16);
        assert!(DataType::String.density().is_variable());
        assert!(DataType::Json.density().is_variable());
        assert_eq!(Density::BIT32.size(3), 12);
        assert_eq!(Density::BIT64.length(17), 2);
    }

    #[test]
    fn test_data_type_tags_round_trip() {
        for dt in DataType::ALL {
            assert_eq!(dt.as_str().parse::<DataType>().unwrap(), dt);
        }
        assert!("float16".parse::<DataType>().is_err());
        let json = serde_json::to_string(&DataType::TimeStamp).unwrap();
        assert_eq!(json, "\"timestamp\"");
    }

    #[test]
    fn test_boolean_aliases_uint8() {
        assert_eq!(DataType::BOOLEAN, DataType::Uint8);
        assert_eq!(TelemValue::Bool(true).inferred_data_type(), DataType::Uint8);
    }

    #[test]
    fn test_big_int_types() {
        assert!(DataType::Int64.uses_big_int());
        assert!(DataType::Uint64.uses_big_int());
        assert!(DataType::TimeStamp.uses_big_int());
        assert!(!DataType::Float64.uses_big_int());
        assert!(!DataType::Int32.uses_big_int());
    }

    #[test]
    fn test_cast_rules() {
        assert!(DataType::Int16.can_safely_cast_to(DataType::Float32));
        assert!(!DataType::Int32.can_safely_cast_to(DataType::Float32));
        assert!(DataType::Float32.can_safely_cast_to(DataType::Float64));
        assert!(!DataType::Float64.can_safely_cast_to(DataType::Float32));
        assert!(!DataType::String.can_safely_cast_to(DataType::Float64));
        assert!(DataType::Float64.can_cast_to(DataType::Uint8));
        assert!(!DataType::Json.can_cast_to(DataType::Float32));
        assert!(DataType::Json.can_cast_to(DataType::Json));
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(Numeric::Number(1.5) < Numeric::BigInt(2));
        assert!(Numeric::BigInt(i64::MAX as i128) > Numeric::BigInt(i64::MAX as i128 - 1));
        assert_eq!(Numeric::Number(2.0), Numeric::BigInt(2));
        assert_eq!(Numeric::BigInt(10).add(Numeric::Number(2.9)), Numeric::BigInt(12));
        assert_eq!(Numeric::Number(10.0).sub(Numeric::BigInt(3)), Numeric::Number(7.0));
    }

    #[test]
    fn test_json_conversions() {
        assert_eq!(TelemValue::BigInt(7).to_json(), serde_json::json!(7));
        assert_eq!(TelemValue::Number(f64::NAN).to_json(), serde_json::Value::Null);
        let v = TelemValue::from_json(serde_json::json!(9), DataType::Int64);
        assert_eq!(v, TelemValue::BigInt(9));
        let v = TelemValue::from_json(serde_json::json!("x"), DataType::Json);
        assert_eq!(v, TelemValue::Json(serde_json::json!("x")));
    }

    #[test]
    fn test_bounds() {
        let b = Bounds::new(10u64, 25u64);
        assert!(b.contains(10));
        assert!(b.contains(24));
        assert!(!b.contains(25));
        assert_eq!(b.span(), 15);
        let combined = b.max_combine(Bounds::new(2, 12));
        assert_eq!(combined, Bounds::new(2, 25));
        assert!(Bounds::new(4u64, 4u64).is_empty());
    }
}
