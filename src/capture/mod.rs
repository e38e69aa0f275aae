//! Camera input and frame handling.
//!
//! This module provides abstractions for capturing frames from a camera
//! and managing camera configuration. A camera is an exclusively owned
//! resource: whoever opens it is responsible for closing it.

mod camera;
mod config;
#[cfg(feature = "camera")]
mod device;
mod frame;

pub use camera::{Camera, CameraError, CameraProvider, DeviceTracker, MockCamera};
pub use config::{CaptureConfig, Facing};
#[cfg(feature = "camera")]
pub use device::DeviceCamera;
pub use frame::Frame;
