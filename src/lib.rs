//! QR Scanning Core
//!
//! Acquires frames from a camera or an uploaded image, normalizes them and
//! decodes QR payloads through an ordered chain of decode strategies.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! capture → normalize → decode → scan → session
//!                          ↓
//!                  metrics (monitoring)
//! ```
//!
//! - [`capture`] owns camera devices and raw frames.
//! - [`normalize`] strips row padding and downsamples large frames.
//! - [`decode`] tries native, software and secondary decoders in order.
//! - [`scan`] runs the live camera loop and the single-pass image path.
//! - [`session`] ties mode selection, source lifetime and results together.
//!
//! # Design Principles
//!
//! - **One source at a time**: a camera is released before a result is
//!   shown, before the mode changes and when the session is dropped
//! - **Single-flight decoding**: the live loop never overlaps two decodes
//! - **Failures are classified**: transient frame failures are absorbed,
//!   acquisition failures are reported once
//!
//! # Example
//!
//! ```no_run
//! use qrscan::{decode_static_image, ScanError};
//!
//! let bytes = std::fs::read("ticket.png").unwrap();
//! match decode_static_image(&bytes) {
//!     Ok(text) => println!("{text}"),
//!     Err(ScanError::NoCodeFound) => eprintln!("no QR code in that image"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod config;
pub mod decode;
pub mod error;
pub mod metrics;
pub mod normalize;
pub mod scan;
pub mod session;

#[cfg(test)]
mod test_support;

// Re-export commonly used types at crate root
pub use capture::{Camera, CameraError, CameraProvider, CaptureConfig, Facing, Frame, MockCamera};
pub use config::{ConfigError, DecodeConfig, ScannerConfig, SessionConfig};
pub use decode::{decode_frame, BarcodeDetector, Capabilities, DecodeChain, StrategyKind};
pub use error::ScanError;
pub use normalize::{Normalizer, PixelBuffer, PixelFormat};
pub use scan::{
    decode_static_image, start_camera_scan, DecodedResult, ScanCallbacks, ScanHandle, ScanOptions,
};
pub use session::{FallbackPolicy, ScanMode, ScannerSession, SessionState, SessionUpdate};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
