//! Software QR decoding with `rqrr`.

use super::strategy::{DecodeStrategy, StrategyError, StrategyKind};
use crate::normalize::NormalizedFrame;
use rqrr::{DeQRError, MetaData, PreparedImage};

/// Fast software matrix decoder used on every live frame.
///
/// Reads the normalized luma plane as-is: no inversion, no preprocessing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareMatrixDecoder;

impl SoftwareMatrixDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl DecodeStrategy for SoftwareMatrixDecoder {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SoftwareMatrix
    }

    fn decode(&self, frame: &NormalizedFrame) -> Result<Option<String>, StrategyError> {
        let buffer = frame.buffer();
        let luma = buffer.to_luma();
        decode_greyscale(&luma, buffer.width() as usize, buffer.height() as usize)
    }
}

/// Decodes the first readable grid in a greyscale plane.
pub(crate) fn decode_greyscale(
    grey: &[u8],
    width: usize,
    height: usize,
) -> Result<Option<String>, StrategyError> {
    let mut prepared =
        PreparedImage::prepare_from_greyscale(width, height, |x, y| grey[y * width + x]);
    first_payload(prepared.detect_grids().iter().map(|grid| grid.decode()))
}

/// Decodes the first readable grid after binarizing at `threshold`.
pub(crate) fn decode_bitmap(
    grey: &[u8],
    width: usize,
    height: usize,
    threshold: u8,
) -> Result<Option<String>, StrategyError> {
    let mut prepared =
        PreparedImage::prepare_from_bitmap(width, height, |x, y| grey[y * width + x] < threshold);
    first_payload(prepared.detect_grids().iter().map(|grid| grid.decode()))
}

fn first_payload(
    attempts: impl Iterator<Item = Result<(MetaData, String), DeQRError>>,
) -> Result<Option<String>, StrategyError> {
    let mut last_error = None;
    for attempt in attempts {
        match attempt {
            Ok((_, content)) if !content.is_empty() => return Ok(Some(content)),
            Ok(_) => {}
            Err(e) => {
                tracing::trace!(error = ?e, "Grid decode failed");
                last_error = Some(format!("{e:?}"));
            }
        }
    }

    match last_error {
        Some(message) => Err(StrategyError::Decode(message)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{PixelBuffer, PixelFormat};
    use crate::test_support::qr_gray;

    #[test]
    fn test_decodes_rendered_code() {
        let image = qr_gray("https://example.com/menu", 240);
        let frame = NormalizedFrame::from_buffer(PixelBuffer::from_gray(image));

        let text = SoftwareMatrixDecoder::new().decode(&frame).unwrap();
        assert_eq!(text.as_deref(), Some("https://example.com/menu"));
    }

    #[test]
    fn test_blank_frame_no_match() {
        let buffer =
            PixelBuffer::new(120, 120, PixelFormat::Gray8, vec![255u8; 120 * 120]).unwrap();
        let frame = NormalizedFrame::from_buffer(buffer);

        assert_eq!(SoftwareMatrixDecoder::new().decode(&frame).unwrap(), None);
    }

    #[test]
    fn test_bitmap_threshold_path() {
        let image = qr_gray("PING", 160);
        let (w, h) = (image.width() as usize, image.height() as usize);

        let text = decode_bitmap(image.as_raw(), w, h, 128).unwrap();
        assert_eq!(text.as_deref(), Some("PING"));
    }
}
