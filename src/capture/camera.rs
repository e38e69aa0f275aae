//! Camera abstraction for frame capture.
//!
//! This module provides a trait-based abstraction over camera hardware,
//! allowing for both real camera input and mock implementations for testing.

use super::{CaptureConfig, Frame};
use crate::error::ScanError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Clone, Error)]
pub enum CameraError {
    #[error("camera access denied: {0}")]
    PermissionDenied(String),
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    #[error("camera capture is not supported here: {0}")]
    Unsupported(String),
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    #[error("camera not initialized")]
    NotInitialized,
}

impl From<CameraError> for ScanError {
    fn from(err: CameraError) -> Self {
        let detail = err.to_string();
        match err {
            CameraError::PermissionDenied(_) => ScanError::PermissionDenied(detail),
            CameraError::DeviceNotFound(_)
            | CameraError::OpenFailed(_)
            | CameraError::ConfigFailed(_) => ScanError::CameraUnavailable(detail),
            CameraError::Unsupported(_) => ScanError::UnsupportedEnvironment(detail),
            CameraError::CaptureFailed(_) | CameraError::NotInitialized => {
                ScanError::DecodeTransientFailure(detail)
            }
        }
    }
}

/// Trait for camera implementations.
///
/// This abstraction allows swapping between real camera hardware
/// and mock implementations for testing.
pub trait Camera {
    /// Opens and initializes the camera with the given configuration.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError>;

    /// Returns the newest frame.
    ///
    /// A frame with zero dimensions means the stream is not producing
    /// video yet; it is not an error.
    fn capture(&mut self) -> Result<Frame, CameraError>;

    /// Checks if the camera is currently open.
    fn is_open(&self) -> bool;

    /// Closes the camera and releases resources. Must be idempotent.
    fn close(&mut self);
}

/// Creates unopened cameras on demand.
///
/// A session asks for a fresh camera every time it starts a camera cycle.
pub trait CameraProvider: Send + Sync {
    /// Returns a new, not yet opened camera.
    fn provide(&self) -> Box<dyn Camera + Send>;
}

impl<F> CameraProvider for F
where
    F: Fn() -> Box<dyn Camera + Send> + Send + Sync,
{
    fn provide(&self) -> Box<dyn Camera + Send> {
        self()
    }
}

/// Counts open devices across every camera that shares it.
///
/// Useful for asserting that two streams never coexist.
#[derive(Debug, Clone, Default)]
pub struct DeviceTracker {
    inner: Arc<TrackerCounts>,
}

#[derive(Debug, Default)]
struct TrackerCounts {
    open: AtomicUsize,
    peak: AtomicUsize,
    opened: AtomicUsize,
    released: AtomicUsize,
}

impl DeviceTracker {
    /// Creates a tracker with every count at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Devices currently open.
    pub fn open_count(&self) -> usize {
        self.inner.open.load(Ordering::SeqCst)
    }

    /// Highest number of devices that were ever open at once.
    pub fn peak(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }

    /// Total successful opens.
    pub fn opened_total(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    /// Total releases.
    pub fn released_total(&self) -> usize {
        self.inner.released.load(Ordering::SeqCst)
    }

    fn acquire(&self) {
        let now = self.inner.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(now, Ordering::SeqCst);
        self.inner.opened.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.inner.open.fetch_sub(1, Ordering::SeqCst);
        self.inner.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mock camera for testing that replays scripted frames.
///
/// Frames are returned in order and repeat once exhausted. With no frames
/// the camera produces blank mid-gray images of the configured size.
#[derive(Debug, Default)]
pub struct MockCamera {
    config: Option<CaptureConfig>,
    sequence: u64,
    frames: Vec<Frame>,
    warmup: usize,
    open_error: Option<CameraError>,
    tracker: Option<DeviceTracker>,
}

impl MockCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replays the given frames in a loop.
    pub fn with_frames(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            ..Self::default()
        }
    }

    /// A camera whose `open` always fails with `error`.
    pub fn failing(error: CameraError) -> Self {
        Self {
            open_error: Some(error),
            ..Self::default()
        }
    }

    /// Returns `count` not-ready frames before real ones, like a stream
    /// whose metadata has not loaded.
    pub fn with_warmup(mut self, count: usize) -> Self {
        self.warmup = count;
        self
    }

    /// Reports opens and releases to `tracker`.
    pub fn with_tracker(mut self, tracker: DeviceTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }
}

impl Camera for MockCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        if let Some(err) = &self.open_error {
            return Err(err.clone());
        }
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        if self.config.is_some() {
            return Ok(());
        }
        self.config = Some(config.clone());
        self.sequence = 0;
        if let Some(tracker) = &self.tracker {
            tracker.acquire();
        }
        tracing::info!(facing = ?config.facing, "MockCamera opened");
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let config = self.config.as_ref().ok_or(CameraError::NotInitialized)?;

        let index = self.sequence as usize;
        self.sequence += 1;

        if index < self.warmup {
            return Ok(Frame::not_ready(self.sequence));
        }

        if self.frames.is_empty() {
            let pixels = vec![128u8; (config.width * config.height) as usize];
            return Ok(Frame::new(
                pixels,
                config.width,
                config.height,
                crate::normalize::PixelFormat::Gray8,
                self.sequence,
            ));
        }

        let frame = &self.frames[(index - self.warmup) % self.frames.len()];
        Ok(Frame::new(
            frame.pixels().to_vec(),
            frame.width(),
            frame.height(),
            frame.format(),
            self.sequence,
        )
        .with_stride(frame.stride()))
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn close(&mut self) {
        if self.config.take().is_some() {
            if let Some(tracker) = &self.tracker {
                tracker.release();
            }
            tracing::info!("MockCamera closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::PixelFormat;

    #[test]
    fn test_mock_camera_lifecycle() {
        let mut camera = MockCamera::new();
        let config = CaptureConfig::with_dimensions(64, 48);

        assert!(!camera.is_open());

        camera.open(&config).unwrap();
        assert!(camera.is_open());

        let frame = camera.capture().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.sequence(), 1);

        let frame2 = camera.capture().unwrap();
        assert_eq!(frame2.sequence(), 2);

        camera.close();
        assert!(!camera.is_open());
    }

    #[test]
    fn test_capture_without_open() {
        let mut camera = MockCamera::new();
        assert!(matches!(
            camera.capture(),
            Err(CameraError::NotInitialized)
        ));
    }

    #[test]
    fn test_warmup_frames_not_ready() {
        let frames = vec![Frame::new(vec![0u8; 4], 2, 2, PixelFormat::Gray8, 0)];
        let mut camera = MockCamera::with_frames(frames).with_warmup(2);
        camera.open(&CaptureConfig::default()).unwrap();

        assert!(!camera.capture().unwrap().is_ready());
        assert!(!camera.capture().unwrap().is_ready());
        assert!(camera.capture().unwrap().is_ready());
    }

    #[test]
    fn test_tracker_counts_once_per_release() {
        let tracker = DeviceTracker::new();
        let mut camera = MockCamera::new().with_tracker(tracker.clone());

        camera.open(&CaptureConfig::default()).unwrap();
        assert_eq!(tracker.open_count(), 1);

        camera.close();
        camera.close();
        assert_eq!(tracker.open_count(), 0);
        assert_eq!(tracker.released_total(), 1);
        assert_eq!(tracker.peak(), 1);
    }

    #[test]
    fn test_failing_camera_never_counts() {
        let tracker = DeviceTracker::new();
        let mut camera = MockCamera::failing(CameraError::PermissionDenied("denied".into()))
            .with_tracker(tracker.clone());

        assert!(camera.open(&CaptureConfig::default()).is_err());
        assert_eq!(tracker.opened_total(), 0);
    }

    #[test]
    fn test_error_mapping() {
        let mapped: ScanError = CameraError::PermissionDenied("x".into()).into();
        assert!(matches!(mapped, ScanError::PermissionDenied(_)));

        let mapped: ScanError = CameraError::DeviceNotFound("x".into()).into();
        assert!(matches!(mapped, ScanError::CameraUnavailable(_)));

        let mapped: ScanError = CameraError::Unsupported("x".into()).into();
        assert!(matches!(mapped, ScanError::UnsupportedEnvironment(_)));

        let mapped: ScanError = CameraError::CaptureFailed("x".into()).into();
        assert!(matches!(mapped, ScanError::DecodeTransientFailure(_)));
    }
}
