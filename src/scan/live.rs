//! Continuous camera scanning.
//!
//! A [`ScanLoop`] samples the newest camera frame on a fixed interval,
//! normalizes it and runs the live [`DecodeChain`] on tokio's blocking
//! pool. Only one decode is ever in flight: the loop awaits it before
//! sampling again.
//!
//! The camera sits in a shared slot. Whoever finishes the cycle first
//! (the loop with a result, or [`ScanHandle::stop`]) claims it by flipping
//! the `stopped` flag, and the slot is emptied and the device closed before
//! anything else happens. A decode still running when `stop()` wins is
//! discarded.

use crate::capture::{Camera, CameraError, CaptureConfig, Facing, Frame};
use crate::config::ScannerConfig;
use crate::decode::DecodeChain;
use crate::error::ScanError;
use crate::metrics::MetricsRegistry;
use crate::normalize::{FrameInput, Normalizer};
use crate::scan::DecodedResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shortest delay between two frame samples.
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(1);

/// Receives the single decoded result of a scan.
pub type ResultCallback = Box<dyn FnOnce(DecodedResult) + Send>;

/// Receives scan errors.
pub type ErrorCallback = Box<dyn FnMut(ScanError) + Send>;

/// Host callbacks for a camera scan.
pub struct ScanCallbacks {
    on_result: ResultCallback,
    on_error: ErrorCallback,
}

impl ScanCallbacks {
    /// Wraps the two host callbacks.
    ///
    /// `on_result` fires at most once, after the camera has been released.
    /// `on_error` fires exactly once for an acquisition failure, and for
    /// transient failures only when [`ScanOptions::notify_transient`] is set.
    pub fn new<R, E>(on_result: R, on_error: E) -> Self
    where
        R: FnOnce(DecodedResult) + Send + 'static,
        E: FnMut(ScanError) + Send + 'static,
    {
        Self {
            on_result: Box::new(on_result),
            on_error: Box::new(on_error),
        }
    }
}

/// Tuning for one camera scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Camera facing requested from the device.
    pub preferred_facing: Facing,
    /// Delay between frame samples.
    pub sample_interval: Duration,
    /// Forward transient failures to `on_error`.
    pub notify_transient: bool,
    /// Cycle number stamped on the result.
    pub cycle: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            preferred_facing: Facing::Environment,
            sample_interval: Duration::from_millis(100),
            notify_transient: false,
            cycle: 0,
        }
    }
}

impl ScanOptions {
    /// Options taken from a loaded configuration.
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            preferred_facing: config.capture.facing,
            sample_interval: config.decode.sample_interval(),
            notify_transient: config.session.notify_transient,
            cycle: 0,
        }
    }

    /// Sets the cycle number.
    pub fn with_cycle(mut self, cycle: u64) -> Self {
        self.cycle = cycle;
        self
    }
}

/// Single-owner home of the live camera.
struct CameraSlot {
    camera: Mutex<Option<Box<dyn Camera + Send>>>,
    stopped: AtomicBool,
}

enum Sample {
    Frame(Frame),
    Failed(CameraError),
    Stopped,
}

impl CameraSlot {
    fn new(camera: Box<dyn Camera + Send>) -> Self {
        Self {
            camera: Mutex::new(Some(camera)),
            stopped: AtomicBool::new(false),
        }
    }

    fn empty() -> Self {
        Self {
            camera: Mutex::new(None),
            stopped: AtomicBool::new(true),
        }
    }

    /// Marks the cycle finished. Only the first caller gets `true`.
    fn claim(&self) -> bool {
        self.stopped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Takes the camera out and closes it. Safe to call any number of times.
    fn release(&self) {
        let camera = self
            .camera
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(mut camera) = camera {
            camera.close();
            tracing::info!("Camera released");
        }
    }

    fn sample(&self) -> Sample {
        if self.is_stopped() {
            return Sample::Stopped;
        }
        let mut guard = self
            .camera
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_mut() {
            Some(camera) => match camera.capture() {
                Ok(frame) => Sample::Frame(frame),
                Err(e) => Sample::Failed(e),
            },
            None => Sample::Stopped,
        }
    }
}

/// Control handle for a running camera scan.
///
/// Dropping the handle stops the scan.
pub struct ScanHandle {
    slot: Arc<CameraSlot>,
    task: Option<JoinHandle<()>>,
}

impl ScanHandle {
    fn finished() -> Self {
        Self {
            slot: Arc::new(CameraSlot::empty()),
            task: None,
        }
    }

    /// Stops sampling and releases the camera.
    ///
    /// Returns once the device is closed. Calling it again, or after the
    /// scan already produced its result, does nothing.
    pub fn stop(&mut self) {
        let first = self.slot.claim();
        self.slot.release();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if first {
            tracing::info!("Camera scan stopped");
        }
    }

    /// Whether the scan has finished, by result, failure or `stop()`.
    pub fn is_stopped(&self) -> bool {
        self.slot.is_stopped()
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ScanHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanHandle")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// The continuous camera scan loop.
pub struct ScanLoop {
    chain: Arc<DecodeChain>,
    normalizer: Normalizer,
    options: ScanOptions,
    metrics: Option<MetricsRegistry>,
}

impl ScanLoop {
    /// Creates a loop that decodes with `chain`.
    ///
    /// Sample intervals shorter than one millisecond are raised to one.
    pub fn new(chain: Arc<DecodeChain>, normalizer: Normalizer, mut options: ScanOptions) -> Self {
        options.sample_interval = options.sample_interval.max(MIN_SAMPLE_INTERVAL);
        Self {
            chain,
            normalizer,
            options,
            metrics: None,
        }
    }

    /// Records loop activity in `metrics`.
    pub fn with_metrics(mut self, metrics: MetricsRegistry) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Opens `camera` and starts sampling on the current tokio runtime.
    ///
    /// Acquisition failures, including a missing runtime, are reported to
    /// `on_error` before this returns, and the returned handle is already
    /// stopped.
    pub fn start(
        self,
        mut camera: Box<dyn Camera + Send>,
        capture: &CaptureConfig,
        callbacks: ScanCallbacks,
    ) -> ScanHandle {
        let ScanCallbacks {
            on_result,
            mut on_error,
        } = callbacks;

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                self.fail(
                    &mut on_error,
                    ScanError::UnsupportedEnvironment(format!("no async runtime: {e}")),
                );
                return ScanHandle::finished();
            }
        };

        let mut config = capture.clone();
        config.facing = self.options.preferred_facing;
        if let Err(e) = camera.open(&config) {
            camera.close();
            let err = match ScanError::from(e) {
                err if err.is_acquisition_failure() => err,
                other => ScanError::CameraUnavailable(other.to_string()),
            };
            self.fail(&mut on_error, err);
            return ScanHandle::finished();
        }

        tracing::info!(
            cycle = self.options.cycle,
            facing = ?config.facing,
            interval_ms = self.options.sample_interval.as_millis() as u64,
            "Camera scan started"
        );

        let slot = Arc::new(CameraSlot::new(camera));
        let task = runtime.spawn(self.run(Arc::clone(&slot), on_result, on_error));
        ScanHandle {
            slot,
            task: Some(task),
        }
    }

    async fn run(
        self,
        slot: Arc<CameraSlot>,
        on_result: ResultCallback,
        mut on_error: ErrorCallback,
    ) {
        let mut ticker = tokio::time::interval(self.options.sample_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let frame = match slot.sample() {
                Sample::Stopped => return,
                Sample::Frame(frame) => frame,
                Sample::Failed(e) => {
                    let err = ScanError::from(e);
                    if err.is_acquisition_failure() {
                        if slot.claim() {
                            slot.release();
                            self.fail(&mut on_error, err);
                        }
                        return;
                    }
                    if slot.is_stopped() {
                        return;
                    }
                    self.transient(&mut on_error, err);
                    continue;
                }
            };
            if let Some(metrics) = &self.metrics {
                metrics.record_frame();
            }

            let normalized = match self.normalizer.normalize(FrameInput::Camera(&frame)) {
                Ok(Some(normalized)) => normalized,
                Ok(None) => {
                    tracing::trace!(sequence = frame.sequence(), "Frame not ready");
                    if let Some(metrics) = &self.metrics {
                        metrics.record_not_ready();
                    }
                    continue;
                }
                Err(e) => {
                    if slot.is_stopped() {
                        return;
                    }
                    self.transient(&mut on_error, e);
                    continue;
                }
            };
            tracing::trace!(
                sequence = frame.sequence(),
                width = normalized.buffer().width(),
                height = normalized.buffer().height(),
                "Sampled frame"
            );

            let chain = Arc::clone(&self.chain);
            let started = Instant::now();
            let outcome = tokio::task::spawn_blocking(move || chain.decode(&normalized)).await;
            if let Some(metrics) = &self.metrics {
                metrics.record_attempt(started.elapsed());
            }

            match outcome {
                Ok(Some(hit)) => {
                    if !slot.claim() {
                        tracing::debug!("Discarding result decoded after stop");
                        return;
                    }
                    slot.release();
                    if let Some(metrics) = &self.metrics {
                        metrics.record_result(hit.strategy);
                    }
                    tracing::info!(
                        cycle = self.options.cycle,
                        strategy = %hit.strategy,
                        "QR code decoded"
                    );
                    on_result(DecodedResult::new(hit.text, self.options.cycle));
                    return;
                }
                Ok(None) => {
                    if slot.is_stopped() {
                        return;
                    }
                }
                Err(e) => {
                    if slot.is_stopped() {
                        return;
                    }
                    self.transient(
                        &mut on_error,
                        ScanError::DecodeTransientFailure(format!("decode task failed: {e}")),
                    );
                }
            }
        }
    }

    fn transient(&self, on_error: &mut ErrorCallback, err: ScanError) {
        tracing::trace!(error = %err, "Transient scan failure");
        if let Some(metrics) = &self.metrics {
            metrics.record_transient();
        }
        if self.options.notify_transient {
            on_error(err);
        }
    }

    fn fail(&self, on_error: &mut ErrorCallback, err: ScanError) {
        tracing::warn!(error = %err, "Camera scan failed");
        if let Some(metrics) = &self.metrics {
            metrics.record_terminal(err.label());
        }
        on_error(err);
    }
}

/// Starts a camera scan with the given chain and normalizer.
///
/// The camera is opened with the default capture settings and the facing
/// from `options`.
pub fn start_camera_scan(
    camera: Box<dyn Camera + Send>,
    chain: Arc<DecodeChain>,
    normalizer: Normalizer,
    callbacks: ScanCallbacks,
    options: ScanOptions,
) -> ScanHandle {
    ScanLoop::new(chain, normalizer, options).start(camera, &CaptureConfig::default(), callbacks)
}
