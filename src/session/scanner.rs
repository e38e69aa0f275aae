//! The scanner session state machine.

use super::state::{
    FallbackPolicy, ScanEvent, ScanMode, SessionError, SessionState, SessionUpdate,
};
use crate::capture::CameraProvider;
use crate::config::ScannerConfig;
use crate::decode::{BarcodeDetector, Capabilities, ChainMatch, DecodeChain};
use crate::error::ScanError;
use crate::metrics::MetricsRegistry;
use crate::normalize::Normalizer;
use crate::scan::{
    decode_still, DecodedResult, ScanCallbacks, ScanHandle, ScanLoop, ScanOptions,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Drives one scanning UI: mode selection, source lifetime and results.
///
/// At most one camera loop exists at a time, and it is always stopped
/// (device closed) before the session enters `Result`, changes mode or is
/// dropped. Camera loops report through an internal channel; the host
/// drains it with [`ScannerSession::next_event`] or
/// [`ScannerSession::poll_events`].
pub struct ScannerSession {
    config: ScannerConfig,
    capabilities: Capabilities,
    live_chain: Arc<DecodeChain>,
    still_chain: Arc<DecodeChain>,
    live_normalizer: Normalizer,
    still_normalizer: Normalizer,
    cameras: Arc<dyn CameraProvider>,
    state: SessionState,
    selected: ScanMode,
    active: Option<ScanHandle>,
    cycle: u64,
    events_tx: UnboundedSender<ScanEvent>,
    events_rx: UnboundedReceiver<ScanEvent>,
    metrics: Option<MetricsRegistry>,
}

impl ScannerSession {
    /// Creates an idle session.
    ///
    /// `detector` is probed once here; it joins the decode chains only if
    /// it supports QR codes.
    pub fn new(
        config: ScannerConfig,
        cameras: Arc<dyn CameraProvider>,
        detector: Option<Arc<dyn BarcodeDetector>>,
    ) -> Self {
        let capabilities = Capabilities::probe(detector);
        let live_chain = Arc::new(DecodeChain::live(&capabilities));
        let still_chain =
            Arc::new(DecodeChain::still(&capabilities, config.decode.enable_secondary));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        tracing::info!(
            native = capabilities.has_native(),
            live = ?live_chain.kinds(),
            still = ?still_chain.kinds(),
            "Scanner session created"
        );

        Self {
            live_normalizer: Normalizer::live(&config.decode),
            still_normalizer: Normalizer::still(&config.decode),
            selected: config.session.initial_mode,
            config,
            capabilities,
            live_chain,
            still_chain,
            cameras,
            state: SessionState::Idle,
            active: None,
            cycle: 0,
            events_tx,
            events_rx,
            metrics: None,
        }
    }

    /// Records scan activity in `metrics`.
    pub fn with_metrics(mut self, metrics: MetricsRegistry) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Selected mode, used by `start` and `scan_again`.
    pub fn mode(&self) -> ScanMode {
        self.selected
    }

    /// Capabilities probed at construction.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Number of the current (or last) scan cycle.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Starts scanning in `mode` from `Idle`.
    ///
    /// Camera mode must be started inside a tokio runtime.
    pub fn start(&mut self, mode: ScanMode) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(self.invalid("start"));
        }
        self.enter(mode);
        Ok(())
    }

    /// Starts a new cycle from `Result`, optionally in a different mode.
    pub fn scan_again(&mut self, mode: Option<ScanMode>) -> Result<(), SessionError> {
        if !matches!(self.state, SessionState::Result(_)) {
            return Err(self.invalid("scan again"));
        }
        self.enter(mode.unwrap_or(self.selected));
        Ok(())
    }

    /// Selects `mode`.
    ///
    /// While scanning, the current source is released before the new one
    /// is created. Otherwise the selection applies to the next cycle.
    pub fn switch_mode(&mut self, mode: ScanMode) {
        match self.state {
            SessionState::Scanning(current) if current != mode => self.enter(mode),
            _ => self.selected = mode,
        }
    }

    /// Decodes an uploaded image in upload mode.
    ///
    /// On success the session enters `Result`. On failure it stays in
    /// `Scanning(Upload)` so the user can pick another file.
    ///
    /// Decoding runs on the calling thread and may take several rqrr passes
    /// over a 1600 px image. Inside a tokio runtime prefer
    /// [`ScannerSession::submit_image_async`].
    pub fn submit_image(&mut self, bytes: &[u8]) -> Result<DecodedResult, SessionError> {
        self.check_upload()?;
        let started = Instant::now();
        let outcome = decode_still(bytes, &self.still_chain, &self.still_normalizer);
        self.finish_upload(outcome, started)
    }

    /// Like [`ScannerSession::submit_image`], but decodes on tokio's
    /// blocking pool.
    pub async fn submit_image_async(
        &mut self,
        bytes: Vec<u8>,
    ) -> Result<DecodedResult, SessionError> {
        self.check_upload()?;
        let chain = Arc::clone(&self.still_chain);
        let normalizer = self.still_normalizer;
        let started = Instant::now();
        let task = tokio::task::spawn_blocking(move || decode_still(&bytes, &chain, &normalizer));
        let outcome = task.await.unwrap_or_else(|e| {
            Err(ScanError::DecodeTransientFailure(format!("decode task failed: {e}")))
        });
        self.finish_upload(outcome, started)
    }

    fn check_upload(&self) -> Result<(), SessionError> {
        if self.state != SessionState::Scanning(ScanMode::Upload) {
            return Err(self.invalid("submit an image"));
        }
        Ok(())
    }

    fn finish_upload(
        &mut self,
        outcome: Result<ChainMatch, ScanError>,
        started: Instant,
    ) -> Result<DecodedResult, SessionError> {
        if let Some(metrics) = &self.metrics {
            metrics.record_attempt(started.elapsed());
        }

        match outcome {
            Ok(hit) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_result(hit.strategy);
                }
                let result = DecodedResult::new(hit.text, self.cycle);
                tracing::info!(cycle = self.cycle, strategy = %hit.strategy, "Upload decoded");
                self.state = SessionState::Result(result.clone());
                Ok(result)
            }
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_terminal(e.label());
                }
                tracing::info!(cycle = self.cycle, error = %e, "Upload not decoded");
                Err(e.into())
            }
        }
    }

    /// Waits for the next update from the camera loop.
    ///
    /// Stale events are skipped. Pending forever when no loop is running.
    pub async fn next_event(&mut self) -> SessionUpdate {
        loop {
            let Some(event) = self.events_rx.recv().await else {
                return SessionUpdate::Ignored;
            };
            match self.handle_event(event) {
                SessionUpdate::Ignored => continue,
                update => return update,
            }
        }
    }

    /// Applies every event queued so far without waiting.
    pub fn poll_events(&mut self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            match self.handle_event(event) {
                SessionUpdate::Ignored => {}
                update => updates.push(update),
            }
        }
        updates
    }

    /// Applies one loop event to the session.
    pub fn handle_event(&mut self, event: ScanEvent) -> SessionUpdate {
        if event.cycle() != self.cycle || self.state != SessionState::Scanning(ScanMode::Camera) {
            tracing::debug!(
                event_cycle = event.cycle(),
                cycle = self.cycle,
                state = self.state.name(),
                "Ignoring stale scan event"
            );
            return SessionUpdate::Ignored;
        }

        match event {
            ScanEvent::Decoded(result) => {
                self.release();
                tracing::info!(cycle = self.cycle, "Session entered result");
                self.state = SessionState::Result(result.clone());
                SessionUpdate::Result(result)
            }
            ScanEvent::Error { error, .. } if error.is_acquisition_failure() => {
                self.release();
                let fallback = match self.config.session.fallback {
                    FallbackPolicy::SwitchToUpload => {
                        self.enter(ScanMode::Upload);
                        Some(ScanMode::Upload)
                    }
                    FallbackPolicy::Stay => {
                        self.state = SessionState::Idle;
                        None
                    }
                };
                tracing::warn!(error = %error, fallback = ?fallback, "Camera acquisition failed");
                SessionUpdate::Failed { error, fallback }
            }
            ScanEvent::Error { error, .. } => SessionUpdate::Transient(error),
        }
    }

    /// Releases every source and returns to `Idle`.
    pub fn shutdown(&mut self) {
        self.release();
        if self.state != SessionState::Idle {
            tracing::info!(cycle = self.cycle, "Scanner session shut down");
        }
        self.state = SessionState::Idle;
    }

    fn enter(&mut self, mode: ScanMode) {
        self.release();
        self.cycle += 1;
        self.selected = mode;
        self.state = SessionState::Scanning(mode);
        tracing::info!(cycle = self.cycle, mode = %mode, "Scanning");

        if mode == ScanMode::Camera {
            self.active = Some(self.start_camera());
        }
    }

    fn start_camera(&self) -> ScanHandle {
        let cycle = self.cycle;
        let results = self.events_tx.clone();
        let errors = self.events_tx.clone();
        let callbacks = ScanCallbacks::new(
            move |result| {
                let _ = results.send(ScanEvent::Decoded(result));
            },
            move |error| {
                let _ = errors.send(ScanEvent::Error { cycle, error });
            },
        );

        let mut scan = ScanLoop::new(
            Arc::clone(&self.live_chain),
            self.live_normalizer,
            ScanOptions::from_config(&self.config).with_cycle(cycle),
        );
        if let Some(metrics) = &self.metrics {
            scan = scan.with_metrics(metrics.clone());
        }
        scan.start(self.cameras.provide(), &self.config.capture, callbacks)
    }

    fn release(&mut self) {
        if let Some(mut handle) = self.active.take() {
            handle.stop();
        }
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            operation,
            state: self.state.name(),
        }
    }
}

impl Drop for ScannerSession {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ScannerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScannerSession")
            .field("state", &self.state)
            .field("selected", &self.selected)
            .field("cycle", &self.cycle)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}
