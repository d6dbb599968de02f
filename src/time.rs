//! Timestamps, spans and ranges
//!
//! Only the subset the series engine depends on: nanosecond-precision
//! timestamps ordered as plain integers, and half-open time ranges describing
//! the wall-clock span a buffer covers.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds since the unix epoch (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeStamp(i64);

impl TimeStamp {
    pub const ZERO: TimeStamp = TimeStamp(0);
    pub const MIN: TimeStamp = TimeStamp(0);
    pub const MAX: TimeStamp = TimeStamp(i64::MAX);

    pub const fn nanoseconds(ns: i64) -> Self {
        TimeStamp(ns)
    }

    pub const fn milliseconds(ms: i64) -> Self {
        TimeStamp(ms * 1_000_000)
    }

    pub const fn seconds(s: i64) -> Self {
        TimeStamp(s * 1_000_000_000)
    }

    /// Current wall-clock time
    pub fn now() -> Self {
        let ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0);
        TimeStamp(ns)
    }

    pub fn nanos(&self) -> i64 {
        self.0
    }

    pub fn span(&self, other: TimeStamp) -> TimeSpan {
        TimeSpan(other.0.saturating_sub(self.0))
    }
}

impl Add<TimeSpan> for TimeStamp {
    type Output = TimeStamp;

    fn add(self, rhs: TimeSpan) -> TimeStamp {
        TimeStamp(self.0.saturating_add(rhs.0))
    }
}

impl Sub<TimeSpan> for TimeStamp {
    type Output = TimeStamp;

    fn sub(self, rhs: TimeSpan) -> TimeStamp {
        TimeStamp(self.0.saturating_sub(rhs.0))
    }
}

impl From<i64> for TimeStamp {
    fn from(ns: i64) -> Self {
        TimeStamp(ns)
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dt = DateTime::<Utc>::from_timestamp_nanos(self.0);
        write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

/// A signed duration in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSpan(i64);

impl TimeSpan {
    pub const ZERO: TimeSpan = TimeSpan(0);
    pub const NANOSECOND: TimeSpan = TimeSpan(1);
    pub const MICROSECOND: TimeSpan = TimeSpan(1_000);
    pub const MILLISECOND: TimeSpan = TimeSpan(1_000_000);
    pub const SECOND: TimeSpan = TimeSpan(1_000_000_000);

    pub const fn nanoseconds(ns: i64) -> Self {
        TimeSpan(ns)
    }

    pub const fn milliseconds(ms: i64) -> Self {
        TimeSpan(ms * 1_000_000)
    }

    pub const fn seconds(s: i64) -> Self {
        TimeSpan(s * 1_000_000_000)
    }

    pub fn nanos(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// A range of time, start inclusive and end exclusive
///
/// `start` is not guaranteed to precede `end`; use [`TimeRange::make_valid`]
/// when the order matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: TimeStamp,
    pub end: TimeStamp,
}

impl TimeRange {
    pub const ZERO: TimeRange = TimeRange {
        start: TimeStamp::ZERO,
        end: TimeStamp::ZERO,
    };

    pub fn new(start: TimeStamp, end: TimeStamp) -> Self {
        Self { start, end }
    }

    /// Range between two raw nanosecond timestamps
    pub fn from_nanos(start: i64, end: i64) -> Self {
        Self::new(TimeStamp(start), TimeStamp(end))
    }

    pub fn span(&self) -> TimeSpan {
        self.start.span(self.end)
    }

    /// Returns true if start does not come after end
    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    /// Returns the range with start and end swapped if needed
    pub fn make_valid(&self) -> TimeRange {
        if self.is_valid() {
            *self
        } else {
            TimeRange {
                start: self.end,
                end: self.start,
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        self.span().is_zero()
    }

    pub fn contains(&self, ts: TimeStamp) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Ranges touching only at their boundaries do not overlap.
    pub fn overlaps_with(&self, other: &TimeRange) -> bool {
        let a = self.make_valid();
        let b = other.make_valid();
        if a == b {
            return true;
        }
        a.start.max(b.start) < a.end.min(b.end)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_contains_is_half_open() {
        let tr = TimeRange::from_nanos(10, 20);
        assert!(tr.contains(TimeStamp::nanoseconds(10)));
        assert!(tr.contains(TimeStamp::nanoseconds(19)));
        assert!(!tr.contains(TimeStamp::nanoseconds(20)));
        assert_eq!(tr.span(), TimeSpan::nanoseconds(10));
    }

    #[test]
    fn test_make_valid_swaps() {
        let tr = TimeRange::from_nanos(20, 10);
        assert!(!tr.is_valid());
        assert_eq!(tr.make_valid(), TimeRange::from_nanos(10, 20));
    }

    #[test]
    fn test_overlaps() {
        let a = TimeRange::from_nanos(0, 10);
        assert!(a.overlaps_with(&TimeRange::from_nanos(5, 15)));
        assert!(!a.overlaps_with(&TimeRange::from_nanos(10, 15)));
        assert!(a.overlaps_with(&a));
    }

    #[test]
    fn test_timestamp_display() {
        assert_eq!(TimeStamp::seconds(0).to_string(), "1970-01-01T00:00:00Z");
        assert_eq!(
            (TimeStamp::seconds(1) + TimeSpan::MILLISECOND).nanos(),
            1_001_000_000
        );
    }
}
