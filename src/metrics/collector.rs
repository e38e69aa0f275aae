//! Metrics collection and registry.

use crate::decode::StrategyKind;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus metrics registry for scan monitoring.
///
/// Cloning is cheap and every clone updates the same counters.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,

    // Sampling
    frames_sampled: IntCounter,
    frames_not_ready: IntCounter,

    // Decoding
    decode_attempts: IntCounter,
    decode_seconds: Histogram,
    results: IntCounterVec,

    // Failures
    transient_failures: IntCounter,
    terminal_failures: IntCounterVec,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all scan metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let frames_sampled = IntCounter::new(
            "qrscan_frames_sampled_total",
            "Camera frames polled by the live loop",
        )?;
        let frames_not_ready = IntCounter::new(
            "qrscan_frames_not_ready_total",
            "Polled frames skipped because the stream had no dimensions yet",
        )?;

        let decode_attempts = IntCounter::new(
            "qrscan_decode_attempts_total",
            "Decode chain runs, live and static",
        )?;
        let decode_seconds = Histogram::with_opts(
            HistogramOpts::new("qrscan_decode_seconds", "Wall time of one decode chain run")
                .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        )?;
        let results = IntCounterVec::new(
            Opts::new("qrscan_results_total", "Payloads decoded, by winning strategy"),
            &["strategy"],
        )?;

        let transient_failures = IntCounter::new(
            "qrscan_transient_failures_total",
            "Frame-level failures recovered inside the live loop",
        )?;
        let terminal_failures = IntCounterVec::new(
            Opts::new("qrscan_terminal_failures_total", "Failures that ended a scan attempt"),
            &["kind"],
        )?;

        // Register all metrics
        registry.register(Box::new(frames_sampled.clone()))?;
        registry.register(Box::new(frames_not_ready.clone()))?;
        registry.register(Box::new(decode_attempts.clone()))?;
        registry.register(Box::new(decode_seconds.clone()))?;
        registry.register(Box::new(results.clone()))?;
        registry.register(Box::new(transient_failures.clone()))?;
        registry.register(Box::new(terminal_failures.clone()))?;

        Ok(Self {
            registry,
            frames_sampled,
            frames_not_ready,
            decode_attempts,
            decode_seconds,
            results,
            transient_failures,
            terminal_failures,
        })
    }

    /// Counts one polled camera frame.
    pub fn record_frame(&self) {
        self.frames_sampled.inc();
    }

    /// Counts one frame skipped as not ready.
    pub fn record_not_ready(&self) {
        self.frames_not_ready.inc();
    }

    /// Counts one decode chain run and its duration.
    pub fn record_attempt(&self, elapsed: Duration) {
        self.decode_attempts.inc();
        self.decode_seconds.observe(elapsed.as_secs_f64());
    }

    /// Counts one decoded payload.
    pub fn record_result(&self, strategy: StrategyKind) {
        self.results.with_label_values(&[strategy.label()]).inc();
    }

    /// Counts one recovered failure.
    pub fn record_transient(&self) {
        self.transient_failures.inc();
    }

    /// Counts one failure that ended an attempt, labelled by error kind.
    pub fn record_terminal(&self, kind: &str) {
        self.terminal_failures.with_label_values(&[kind]).inc();
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        registry.record_frame();
        registry.record_frame();
        registry.record_attempt(Duration::from_millis(12));
        registry.record_result(StrategyKind::SoftwareMatrix);
        registry.record_terminal("permission_denied");

        let output = registry.encode().unwrap();
        assert!(output.contains("qrscan_frames_sampled_total 2"));
        assert!(output.contains("qrscan_decode_attempts_total 1"));
        assert!(output.contains("qrscan_results_total{strategy=\"software_matrix\"} 1"));
        assert!(output.contains("qrscan_terminal_failures_total{kind=\"permission_denied\"} 1"));
    }

    #[test]
    fn test_clones_share_counters() {
        let registry = MetricsRegistry::new().unwrap();
        let clone = registry.clone();
        clone.record_transient();

        let output = registry.encode().unwrap();
        assert!(output.contains("qrscan_transient_failures_total 1"));
    }

    #[test]
    fn test_metrics_encode() {
        let registry = MetricsRegistry::new().unwrap();
        let output = registry.encode().unwrap();

        // Plain counters appear even before the first update
        assert!(output.contains("qrscan_frames_sampled_total"));
        assert!(output.contains("qrscan_decode_seconds"));
    }
}
