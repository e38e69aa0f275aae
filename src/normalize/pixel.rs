//! Pixel buffers handed to decode strategies.

use crate::error::ScanError;
use image::{GrayImage, RgbaImage};
use std::borrow::Cow;

/// Sample layout of a frame or buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One luma byte per pixel.
    Gray8,
    /// Three bytes per pixel, red first.
    Rgb8,
    /// Four bytes per pixel, red first, straight alpha.
    Rgba8,
}

impl PixelFormat {
    /// Bytes used by a single pixel.
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }
}

/// A normalized, tightly packed frame ready for decoding.
///
/// Rows carry no padding and the sample count always matches
/// `width * height * bytes_per_pixel`. Buffers are produced per decode
/// attempt and are not retained afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Creates a buffer, checking that `data` matches the dimensions.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, ScanError> {
        if width == 0 || height == 0 {
            return Err(ScanError::InvalidInput(format!(
                "buffer dimensions must be non-zero, got {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(ScanError::InvalidInput(format!(
                "buffer holds {} bytes, {width}x{height} {format:?} needs {expected}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Wraps a grayscale image without copying.
    pub fn from_gray(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            format: PixelFormat::Gray8,
            data: image.into_raw(),
        }
    }

    /// Wraps an RGBA image without copying.
    pub fn from_rgba(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            format: PixelFormat::Rgba8,
            data: image.into_raw(),
        }
    }

    /// Buffer width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Buffer height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sample layout.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw samples.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Length of the longest edge.
    #[inline]
    pub fn longest_edge(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Returns the luma plane, borrowing when the buffer is already gray.
    ///
    /// Uses integer BT.601 weights. Transparent pixels read as white so
    /// codes printed on transparent backgrounds keep their quiet zone.
    pub fn to_luma(&self) -> Cow<'_, [u8]> {
        match self.format {
            PixelFormat::Gray8 => Cow::Borrowed(&self.data),
            PixelFormat::Rgb8 => Cow::Owned(
                self.data
                    .chunks_exact(3)
                    .map(|px| luma(px[0], px[1], px[2]))
                    .collect(),
            ),
            PixelFormat::Rgba8 => Cow::Owned(
                self.data
                    .chunks_exact(4)
                    .map(|px| {
                        let y = luma(px[0], px[1], px[2]) as u32;
                        let a = px[3] as u32;
                        ((y * a + 255 * (255 - a)) / 255) as u8
                    })
                    .collect(),
            ),
        }
    }

    /// Converts into an RGBA buffer.
    pub(crate) fn into_rgba(self) -> Self {
        let data = match self.format {
            PixelFormat::Rgba8 => return self,
            PixelFormat::Gray8 => self.data.iter().flat_map(|&y| [y, y, y, 255]).collect(),
            PixelFormat::Rgb8 => self
                .data
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], 255])
                .collect(),
        };
        Self {
            width: self.width,
            height: self.height,
            format: PixelFormat::Rgba8,
            data,
        }
    }

    pub(crate) fn into_gray_image(self) -> Option<GrayImage> {
        GrayImage::from_raw(self.width, self.height, self.data)
    }

    pub(crate) fn into_rgba_image(self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data)
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32) >> 8) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_mismatched_length() {
        let result = PixelBuffer::new(4, 4, PixelFormat::Rgba8, vec![0u8; 16]);
        assert!(matches!(result, Err(ScanError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        let result = PixelBuffer::new(0, 4, PixelFormat::Gray8, Vec::new());
        assert!(matches!(result, Err(ScanError::InvalidInput(_))));
    }

    #[test]
    fn test_gray_luma_is_borrowed() {
        let buffer = PixelBuffer::new(2, 1, PixelFormat::Gray8, vec![10, 20]).unwrap();
        assert!(matches!(buffer.to_luma(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_rgba_luma_weights() {
        let data = vec![255, 255, 255, 255, 0, 0, 0, 255];
        let buffer = PixelBuffer::new(2, 1, PixelFormat::Rgba8, data).unwrap();
        let luma = buffer.to_luma();
        assert!(luma[0] >= 254);
        assert_eq!(luma[1], 0);
    }

    #[test]
    fn test_transparent_reads_as_white() {
        let buffer = PixelBuffer::new(1, 1, PixelFormat::Rgba8, vec![0, 0, 0, 0]).unwrap();
        assert_eq!(buffer.to_luma()[0], 255);
    }

    #[test]
    fn test_into_rgba_expands_gray() {
        let buffer = PixelBuffer::new(1, 1, PixelFormat::Gray8, vec![42]).unwrap();
        let rgba = buffer.into_rgba();
        assert_eq!(rgba.format(), PixelFormat::Rgba8);
        assert_eq!(rgba.data(), &[42, 42, 42, 255]);
    }
}
