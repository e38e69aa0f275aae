//! Physical camera backed by `nokhwa`.
//!
//! The nokhwa device is not `Send`, so it lives on a dedicated capture
//! thread that keeps only the newest decoded frame. `capture` hands that
//! frame over and `close` stops the stream and joins the thread.

use super::{Camera, CameraError, CaptureConfig, Frame};
use crate::normalize::PixelFormat;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::NokhwaError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Camera device opened through the platform's native capture API.
#[derive(Default)]
pub struct DeviceCamera {
    worker: Option<CaptureWorker>,
}

struct CaptureWorker {
    latest: Arc<Mutex<Option<Frame>>>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    polled: u64,
}

impl DeviceCamera {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Camera for DeviceCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        if self.worker.is_some() {
            return Ok(());
        }

        let latest = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = {
            let latest = Arc::clone(&latest);
            let running = Arc::clone(&running);
            let config = config.clone();
            std::thread::Builder::new()
                .name("qrscan-capture".into())
                .spawn(move || capture_thread(config, latest, running, ready_tx))
                .map_err(|e| CameraError::OpenFailed(e.to_string()))?
        };

        let opened = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(CameraError::OpenFailed("capture thread exited".into())));

        let mut worker = CaptureWorker {
            latest,
            running,
            thread: Some(thread),
            polled: 0,
        };
        if let Err(err) = opened {
            worker.shutdown();
            return Err(err);
        }

        tracing::info!(
            device = config.device_id,
            width = config.width,
            height = config.height,
            facing = ?config.facing,
            "Camera device opened"
        );
        self.worker = Some(worker);
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let worker = self.worker.as_mut().ok_or(CameraError::NotInitialized)?;
        worker.polled += 1;
        let frame = worker
            .latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        Ok(frame.unwrap_or_else(|| Frame::not_ready(worker.polled)))
    }

    fn is_open(&self) -> bool {
        self.worker.is_some()
    }

    fn close(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown();
            tracing::info!("Camera device closed");
        }
    }
}

impl Drop for DeviceCamera {
    fn drop(&mut self) {
        self.close();
    }
}

impl CaptureWorker {
    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("Capture thread panicked");
            }
        }
    }
}

fn capture_thread(
    config: CaptureConfig,
    latest: Arc<Mutex<Option<Frame>>>,
    running: Arc<AtomicBool>,
    ready: mpsc::Sender<Result<(), CameraError>>,
) {
    let format = CameraFormat::new(
        Resolution::new(config.width, config.height),
        FrameFormat::MJPEG,
        config.fps,
    );
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

    let mut device = match nokhwa::Camera::new(CameraIndex::Index(config.device_id), requested) {
        Ok(device) => device,
        Err(e) => {
            let _ = ready.send(Err(map_open_error(e)));
            return;
        }
    };
    if let Err(e) = device.open_stream() {
        let _ = ready.send(Err(map_open_error(e)));
        return;
    }
    let _ = ready.send(Ok(()));

    let mut sequence = 0u64;
    while running.load(Ordering::SeqCst) {
        let decoded = device
            .frame()
            .and_then(|buffer| buffer.decode_image::<RgbFormat>());
        match decoded {
            Ok(image) => {
                sequence += 1;
                let (width, height) = (image.width(), image.height());
                let frame =
                    Frame::new(image.into_raw(), width, height, PixelFormat::Rgb8, sequence);
                *latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(frame);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Dropped camera frame");
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }

    if let Err(e) = device.stop_stream() {
        tracing::warn!(error = %e, "Failed to stop camera stream");
    }
}

fn map_open_error(err: NokhwaError) -> CameraError {
    let message = err.to_string();
    match err {
        NokhwaError::UnsupportedOperationError(_) | NokhwaError::NotImplementedError(_) => {
            CameraError::Unsupported(message)
        }
        _ if message.to_lowercase().contains("permission") => {
            CameraError::PermissionDenied(message)
        }
        NokhwaError::OpenDeviceError(..) => CameraError::DeviceNotFound(message),
        _ => CameraError::OpenFailed(message),
    }
}
