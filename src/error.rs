//! Scan error taxonomy.
//!
//! Every failure the core reports to a host is one of these variants.
//! Acquisition failures end a camera attempt, transient failures are
//! absorbed by the live loop, and the static-image failures are returned
//! directly to the caller.

use thiserror::Error;

/// Errors surfaced by the scanning core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// The user or platform refused camera access.
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),
    /// No usable camera device could be opened.
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),
    /// The runtime lacks something the scanner needs (no camera API, no async runtime).
    #[error("unsupported environment: {0}")]
    UnsupportedEnvironment(String),
    /// A single frame could not be captured, normalized or decoded.
    #[error("transient decode failure: {0}")]
    DecodeTransientFailure(String),
    /// The static image was readable but carries no QR code.
    #[error("no QR code found in the image")]
    NoCodeFound,
    /// The supplied bytes or buffer are not a usable image.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ScanError {
    /// Returns true for failures that end a camera attempt.
    pub fn is_acquisition_failure(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied(_) | Self::CameraUnavailable(_) | Self::UnsupportedEnvironment(_)
        )
    }

    /// Returns true when the error ends the operation that produced it.
    ///
    /// Only [`ScanError::DecodeTransientFailure`] is recoverable.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::DecodeTransientFailure(_))
    }

    /// Short, stable label used for metrics and log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "permission_denied",
            Self::CameraUnavailable(_) => "camera_unavailable",
            Self::UnsupportedEnvironment(_) => "unsupported_environment",
            Self::DecodeTransientFailure(_) => "decode_transient_failure",
            Self::NoCodeFound => "no_code_found",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquisition_classification() {
        assert!(ScanError::PermissionDenied("x".into()).is_acquisition_failure());
        assert!(ScanError::CameraUnavailable("x".into()).is_acquisition_failure());
        assert!(ScanError::UnsupportedEnvironment("x".into()).is_acquisition_failure());
        assert!(!ScanError::DecodeTransientFailure("x".into()).is_acquisition_failure());
        assert!(!ScanError::NoCodeFound.is_acquisition_failure());
    }

    #[test]
    fn test_only_transient_is_recoverable() {
        assert!(!ScanError::DecodeTransientFailure("blur".into()).is_terminal());
        assert!(ScanError::NoCodeFound.is_terminal());
        assert!(ScanError::InvalidInput("empty".into()).is_terminal());
    }

    #[test]
    fn test_no_code_message() {
        assert_eq!(
            ScanError::NoCodeFound.to_string(),
            "no QR code found in the image"
        );
    }
}
