//! Error handling for telem-rs
//!
//! This module defines the crate-wide error type and a Result alias. Every
//! hard failure in the engine is reported synchronously through [`TelemError`]
//! at the point where the violated precondition is detected; soft conditions
//! (releasing an unacquired GPU buffer, reading a stale GPU handle) are logged
//! through `tracing` instead.

use crate::types::DataType;
use thiserror::Error;

/// Main error type for telem-rs operations
#[derive(Error, Debug)]
pub enum TelemError {
    /// The data type of a series could not be determined or the supplied data
    /// does not fit the requested type
    #[error("Construction error: {0}")]
    Construction(String),

    /// Two series (or a series and a requested view) disagree on data type
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: DataType, actual: DataType },

    /// No value exists at the requested index or alignment
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation is not defined for the series' data type
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Allocation requested with an invalid capacity
    #[error("Capacity error: {0}")]
    Capacity(String),

    /// Errors reported by a GPU buffer controller
    #[error("GL error: {0}")]
    Gl(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TelemError>,
    },
}

impl TelemError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TelemError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(expected: DataType, actual: DataType) -> Self {
        TelemError::TypeMismatch { expected, actual }
    }

    /// Strip any context wrappers and return the underlying error
    pub fn root(&self) -> &TelemError {
        match self {
            TelemError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for TelemError {
    fn from(err: serde_json::Error) -> Self {
        TelemError::Serialization(err.to_string())
    }
}

/// Result type alias for telem-rs operations
pub type Result<T> = std::result::Result<T, TelemError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
