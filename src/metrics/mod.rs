//! Prometheus metrics for scan monitoring.
//!
//! # Metrics Exposed
//!
//! ## Sampling
//! - `qrscan_frames_sampled_total` - Camera frames polled by the live loop
//! - `qrscan_frames_not_ready_total` - Frames skipped before the stream had dimensions
//!
//! ## Decoding
//! - `qrscan_decode_attempts_total` - Decode chain runs
//! - `qrscan_decode_seconds` - Histogram of chain run time
//! - `qrscan_results_total{strategy}` - Payloads decoded, by winning strategy
//!
//! ## Failures
//! - `qrscan_transient_failures_total` - Recovered frame-level failures
//! - `qrscan_terminal_failures_total{kind}` - Failures that ended an attempt
//!
//! With the `metrics` feature, [`MetricsServer`] serves them over HTTP.

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
