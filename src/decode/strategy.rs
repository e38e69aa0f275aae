//! The decode strategy abstraction.

use crate::normalize::NormalizedFrame;
use thiserror::Error;

/// Identifies a strategy for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Platform-provided barcode detection.
    Native,
    /// General-purpose software decoder on the normalized buffer.
    SoftwareMatrix,
    /// Slower, higher-recall software decoder for still images.
    SecondarySoftware,
}

impl StrategyKind {
    /// Stable label for metrics and log fields.
    pub fn label(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::SoftwareMatrix => "software_matrix",
            Self::SecondarySoftware => "secondary_software",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors a strategy may raise. The chain turns every one of them into
/// "no match".
#[derive(Debug, Clone, Error)]
pub enum StrategyError {
    #[error("detector failed: {0}")]
    Detector(String),
    #[error("grid decode failed: {0}")]
    Decode(String),
}

/// A single decoding backend.
///
/// Implementations return `Ok(None)` when the frame holds no readable code.
pub trait DecodeStrategy: Send + Sync {
    /// What kind of backend this is.
    fn kind(&self) -> StrategyKind;

    /// Attempts to decode one payload from `frame`.
    fn decode(&self, frame: &NormalizedFrame) -> Result<Option<String>, StrategyError>;
}
