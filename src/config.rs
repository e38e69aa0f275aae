//! File-based scanner configuration.
//!
//! A single TOML document with one table per layer:
//!
//! ```toml
//! [capture]
//! device_id = 0
//! facing = "environment"
//!
//! [decode]
//! static_max_edge = 1600
//!
//! [session]
//! initial_mode = "upload"
//! fallback = "switch_to_upload"
//! ```

use crate::capture::CaptureConfig;
use crate::session::{FallbackPolicy, ScanMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    #[error("invalid max edge {0} (must be at least 64 px)")]
    InvalidMaxEdge(u32),
    #[error("sample interval must be non-zero")]
    InvalidSampleInterval,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Normalization and sampling settings for the decode pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Longest edge of live frames handed to software decoders.
    pub live_max_edge: u32,
    /// Longest edge of uploaded images handed to software decoders.
    pub static_max_edge: u32,
    /// Delay between live sampling steps, in milliseconds.
    pub sample_interval_ms: u64,
    /// Whether uploads fall back to the slower preprocessing decoder.
    pub enable_secondary: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            live_max_edge: 1280,
            static_max_edge: 1600,
            sample_interval_ms: 100,
            enable_secondary: true,
        }
    }
}

impl DecodeConfig {
    /// Delay between live sampling steps.
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for edge in [self.live_max_edge, self.static_max_edge] {
            if edge < 64 {
                return Err(ConfigError::InvalidMaxEdge(edge));
            }
        }
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::InvalidSampleInterval);
        }
        Ok(())
    }
}

/// Session behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Mode selected when a session is created.
    pub initial_mode: ScanMode,
    /// What to do when the camera cannot be acquired.
    pub fallback: FallbackPolicy,
    /// Forward per-frame transient failures to the host.
    pub notify_transient: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_mode: ScanMode::Camera,
            fallback: FallbackPolicy::Stay,
            notify_transient: false,
        }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScannerConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub decode: DecodeConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl ScannerConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ScannerConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;
        self.decode.validate()
    }
}
