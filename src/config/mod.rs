//! Configuration module for telem-rs
//!
//! Engine-wide settings that callers usually want to share between every
//! series they allocate:
//! - Log filter used by [`crate::logging::init`]
//! - Default GPU usage hint for allocated series
//! - An optional ceiling on allocation capacity
//!
//! # Config Location
//!
//! The default config file lives in the platform config directory:
//! - **Linux**: `~/.config/telem-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/telem-rs/config.toml`
//! - **Windows**: `%APPDATA%\telem-rs\config.toml`
//!
//! # Example
//!
//! ```
//! use telem_rs::config::TelemConfig;
//! use telem_rs::DataType;
//!
//! let config = TelemConfig::from_toml_str(
//!     r#"
//!     [gl]
//!     usage = "dynamic"
//!
//!     [alloc]
//!     max_capacity = 1024
//!     "#,
//! )
//! .unwrap();
//!
//! assert!(config.alloc(2048, DataType::Float32).is_err());
//! let series = config.alloc(512, DataType::Float32).unwrap();
//! assert_eq!(series.capacity(), 512);
//! ```

use crate::error::{Result, TelemError};
use crate::gl::GlUsage;
use crate::series::Series;
use crate::types::DataType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory name under the platform config dir
pub const APP_DIR: &str = "telem-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default log filter directive
pub const DEFAULT_LOG_FILTER: &str = "info,telem_rs=debug";

// ==================== Config Directory ====================

/// Get the path of the default config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_DIR).join(CONFIG_FILE))
}

// ==================== Sections ====================

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// GPU buffer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlConfig {
    /// Usage hint given to series allocated through [`TelemConfig::alloc`]
    pub usage: GlUsage,
}

/// Allocation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocConfig {
    /// Largest capacity [`TelemConfig::alloc`] will accept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<usize>,
}

// ==================== TelemConfig ====================

/// Engine configuration, persisted as TOML
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemConfig {
    pub logging: LoggingConfig,
    pub gl: GlConfig,
    pub alloc: AllocConfig,
}

impl TelemConfig {
    /// Parse a config from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| TelemError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| TelemError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TelemError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load the default config file, falling back to defaults
    pub fn load_or_default() -> Self {
        let Some(path) = default_config_path() else {
            tracing::warn!("Could not determine config directory, using defaults");
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                TelemError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| {
            TelemError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Allocate a series using the configured usage hint and capacity ceiling
    pub fn alloc(&self, capacity: usize, data_type: DataType) -> Result<Series> {
        if let Some(max) = self.alloc.max_capacity {
            if capacity > max {
                return Err(TelemError::Capacity(format!(
                    "requested capacity {} exceeds configured maximum {}",
                    capacity, max
                )));
            }
        }
        Ok(Series::alloc(capacity, data_type)?.with_gl_usage(self.gl.usage))
    }
}
