//! # telem-rs: typed telemetry arrays
//!
//! Columnar storage for hardware telemetry on its way to a plot. Samples are
//! kept in typed, fixed-capacity buffers that can be filled incrementally,
//! addressed by index or by a shared alignment space, and streamed to a GPU
//! buffer without re-uploading what is already there.
//!
//! ## Architecture
//!
//! - **Series**: one typed buffer with a write cursor, sample offset,
//!   alignment and time range ([`series`])
//! - **MultiSeries**: an ordered, possibly sparse list of same-typed series
//!   read as one sequence ([`multi`])
//! - **GL**: the controller trait and per-series buffer ownership ([`gl`])
//! - **Crude**: the serde wire form used at storage/transport boundaries
//!   ([`series::crude`])
//!
//! Everything is synchronous and single-threaded. Each series expects one
//! writer; readers that hold clones or sub-views keep seeing the data as it
//! was when they were taken.
//!
//! ## Example
//!
//! ```
//! use telem_rs::{DataType, MultiSeries, Series, TelemValue};
//!
//! let a = Series::from(vec![1.0f32, 2.0, 3.0]).with_alignment(0);
//! let b = Series::from(vec![4.0f32, 5.0]).with_alignment(10);
//! let multi = MultiSeries::new(vec![a, b]).unwrap();
//!
//! assert_eq!(multi.len(), 5);
//! assert_eq!(multi.at_alignment(11), Some(TelemValue::Number(5.0)));
//! assert_eq!(multi.at_alignment(5), None);
//! assert_eq!(multi.data_type(), DataType::Float32);
//! ```

pub mod config;
pub mod error;
pub mod gl;
pub mod logging;
pub mod multi;
pub mod series;
pub mod time;
pub mod types;

// Re-export commonly used types
pub use config::TelemConfig;
pub use error::{Result, ResultExt, TelemError};
pub use gl::{BufferTarget, GlBufferHandle, GlController, GlUsage, ReleaseOutcome};
pub use multi::MultiSeries;
pub use series::{
    CrudeSeries, NativeSample, Series, SeriesBuffer, SeriesData, SeriesDigest, SeriesState,
    WritePos,
};
pub use time::{TimeRange, TimeSpan, TimeStamp};
pub use types::{Bounds, DataType, Density, Numeric, TelemValue};
