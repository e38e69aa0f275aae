//! Frame normalization.
//!
//! Every source the scanner accepts (a live camera frame, a decoded static
//! image, an in-memory bitmap) is turned into a tightly packed
//! [`PixelBuffer`] whose longest edge is bounded. Bounding the edge bounds
//! the worst-case cost of the software decoders; the unscaled buffer is
//! kept alongside for strategies that prefer full resolution.

mod pixel;
mod resize;

pub use pixel::{PixelBuffer, PixelFormat};
pub use resize::{downscale_to_fit, fit_dimensions};

use crate::capture::Frame;
use crate::config::DecodeConfig;
use crate::error::ScanError;
use image::DynamicImage;

/// A source to normalize.
#[derive(Debug, Clone, Copy)]
pub enum FrameInput<'a> {
    /// A frame polled from a live camera.
    Camera(&'a Frame),
    /// A decoded static image.
    Still(&'a DynamicImage),
    /// A bitmap already in memory.
    Bitmap(&'a PixelBuffer),
}

/// Output of normalization.
#[derive(Debug, Clone)]
pub struct NormalizedFrame {
    buffer: PixelBuffer,
    source: Option<PixelBuffer>,
}

impl NormalizedFrame {
    /// Wraps a buffer that needed no scaling.
    pub fn from_buffer(buffer: PixelBuffer) -> Self {
        Self {
            buffer,
            source: None,
        }
    }

    /// The bounded buffer for software decoders.
    #[inline]
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// The full-resolution buffer, which equals [`Self::buffer`] when no
    /// scaling happened.
    #[inline]
    pub fn source(&self) -> &PixelBuffer {
        self.source.as_ref().unwrap_or(&self.buffer)
    }

    /// Returns true if the buffer was downsampled.
    #[inline]
    pub fn was_scaled(&self) -> bool {
        self.source.is_some()
    }
}

/// Converts frame sources into decoder-ready buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    max_edge: u32,
}

impl Normalizer {
    /// Creates a normalizer bounding the longest edge to `max_edge` pixels.
    pub fn new(max_edge: u32) -> Self {
        Self {
            max_edge: max_edge.max(1),
        }
    }

    /// Normalizer for live camera frames.
    pub fn live(config: &DecodeConfig) -> Self {
        Self::new(config.live_max_edge)
    }

    /// Normalizer for uploaded images.
    pub fn still(config: &DecodeConfig) -> Self {
        Self::new(config.static_max_edge)
    }

    /// Longest edge handed to software decoders.
    pub fn max_edge(&self) -> u32 {
        self.max_edge
    }

    /// Normalizes `input`.
    ///
    /// Returns `Ok(None)` while the source has no dimensions yet (a camera
    /// whose stream has not started). Malformed camera frames are transient
    /// failures; malformed images and bitmaps are invalid input.
    pub fn normalize(&self, input: FrameInput<'_>) -> Result<Option<NormalizedFrame>, ScanError> {
        let full = match input {
            FrameInput::Camera(frame) => {
                if !frame.is_ready() {
                    return Ok(None);
                }
                if !frame.is_valid() {
                    return Err(ScanError::DecodeTransientFailure(format!(
                        "camera frame {} is truncated ({} bytes for {}x{})",
                        frame.sequence(),
                        frame.pixels().len(),
                        frame.width(),
                        frame.height()
                    )));
                }
                let buffer = PixelBuffer::new(
                    frame.width(),
                    frame.height(),
                    frame.format(),
                    frame.packed_pixels(),
                )
                .map_err(|e| ScanError::DecodeTransientFailure(e.to_string()))?;
                match buffer.format() {
                    PixelFormat::Rgb8 => buffer.into_rgba(),
                    _ => buffer,
                }
            }
            FrameInput::Still(image) => {
                if image.width() == 0 || image.height() == 0 {
                    return Ok(None);
                }
                match image {
                    DynamicImage::ImageLuma8(gray) => PixelBuffer::from_gray(gray.clone()),
                    other => PixelBuffer::from_rgba(other.to_rgba8()),
                }
            }
            FrameInput::Bitmap(buffer) => match buffer.format() {
                PixelFormat::Rgb8 => buffer.clone().into_rgba(),
                _ => buffer.clone(),
            },
        };

        Ok(Some(match downscale_to_fit(&full, self.max_edge) {
            Some(scaled) => NormalizedFrame {
                buffer: scaled,
                source: Some(full),
            },
            None => NormalizedFrame::from_buffer(full),
        }))
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::live(&DecodeConfig::default())
    }
}
