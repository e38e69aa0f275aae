//! Frame type representing a captured camera image with metadata.

use crate::normalize::PixelFormat;
use image::DynamicImage;
use std::time::Instant;

/// A single frame delivered by a camera.
///
/// Rows may carry padding (`stride > width * bytes_per_pixel`). A frame
/// with zero width or height means the device has not produced video yet.
#[derive(Clone)]
pub struct Frame {
    /// Raw pixel data in `format`.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Bytes per row.
    stride: usize,
    /// Sample layout.
    format: PixelFormat,
    /// Capture timestamp.
    timestamp: Instant,
    /// Monotonic sequence number.
    sequence: u64,
}

impl Frame {
    /// Creates a tightly packed frame.
    pub fn new(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        sequence: u64,
    ) -> Self {
        let stride = width as usize * format.bytes_per_pixel();
        Self {
            pixels,
            width,
            height,
            stride,
            format,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Sets an explicit row stride in bytes.
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// A placeholder frame for devices whose stream has no dimensions yet.
    pub fn not_ready(sequence: u64) -> Self {
        Self::new(Vec::new(), 0, 0, PixelFormat::Gray8, sequence)
    }

    /// Builds a frame from a decoded image, keeping gray images gray.
    pub fn from_image(image: &DynamicImage, sequence: u64) -> Self {
        match image {
            DynamicImage::ImageLuma8(gray) => Self::new(
                gray.as_raw().clone(),
                gray.width(),
                gray.height(),
                PixelFormat::Gray8,
                sequence,
            ),
            other => {
                let rgba = other.to_rgba8();
                let (width, height) = rgba.dimensions();
                Self::new(rgba.into_raw(), width, height, PixelFormat::Rgba8, sequence)
            }
        }
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the row stride in bytes.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the sample layout.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the capture timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns true once the stream has produced real dimensions.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the pixel buffer covers every row.
    pub fn is_valid(&self) -> bool {
        if !self.is_ready() {
            return false;
        }
        let row_bytes = self.width as usize * self.format.bytes_per_pixel();
        if self.stride < row_bytes {
            return false;
        }
        let needed = self.stride * (self.height as usize - 1) + row_bytes;
        self.pixels.len() >= needed
    }

    /// Copies the pixel rows without stride padding.
    pub(crate) fn packed_pixels(&self) -> Vec<u8> {
        let row_bytes = self.width as usize * self.format.bytes_per_pixel();
        if self.stride == row_bytes {
            return self.pixels[..row_bytes * self.height as usize].to_vec();
        }
        let mut packed = Vec::with_capacity(row_bytes * self.height as usize);
        for row in 0..self.height as usize {
            let start = row * self.stride;
            packed.extend_from_slice(&self.pixels[start..start + row_bytes]);
        }
        packed
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("stride", &self.stride)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}
