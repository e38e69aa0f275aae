//! Session state and the updates a host reacts to.

use crate::error::ScanError;
use crate::scan::DecodedResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Live camera sampling.
    #[default]
    Camera,
    /// One uploaded image at a time.
    Upload,
}

impl ScanMode {
    /// Lowercase name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Upload => "upload",
        }
    }
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reaction to a camera acquisition failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Report the error and go idle.
    #[default]
    Stay,
    /// Report the error and continue in upload mode.
    SwitchToUpload,
}

/// What the session is doing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing acquired, nothing running.
    #[default]
    Idle,
    /// Waiting for a code from the given source.
    Scanning(ScanMode),
    /// A code was decoded; every source has been released.
    Result(DecodedResult),
}

impl SessionState {
    /// Short name for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning(ScanMode::Camera) => "scanning_camera",
            Self::Scanning(ScanMode::Upload) => "scanning_upload",
            Self::Result(_) => "result",
        }
    }
}

/// Something a scan loop reported, tagged with the cycle it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// The loop decoded a payload.
    Decoded(DecodedResult),
    /// The loop reported an error.
    Error {
        /// Cycle of the loop that failed.
        cycle: u64,
        /// The failure.
        error: ScanError,
    },
}

impl ScanEvent {
    /// Cycle the event belongs to.
    pub fn cycle(&self) -> u64 {
        match self {
            Self::Decoded(result) => result.cycle(),
            Self::Error { cycle, .. } => *cycle,
        }
    }
}

/// Outcome of feeding a [`ScanEvent`] to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// The session entered `Result`.
    Result(DecodedResult),
    /// The camera could not be acquired. `fallback` names the mode the
    /// session switched to, if any.
    Failed {
        /// The acquisition failure.
        error: ScanError,
        /// Mode entered automatically, per [`FallbackPolicy`].
        fallback: Option<ScanMode>,
    },
    /// A recoverable per-frame failure; scanning continues.
    Transient(ScanError),
    /// The event belonged to an earlier cycle or no longer applies.
    Ignored,
}

/// Errors returned by session operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The scan itself failed.
    #[error(transparent)]
    Scan(#[from] ScanError),
    /// The operation is not allowed in the current state.
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        /// Operation that was attempted.
        operation: &'static str,
        /// State name at the time.
        state: &'static str,
    },
}
