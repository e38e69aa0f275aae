//! Higher-recall software decoding for still images.
//!
//! Runs `rqrr` over a fixed cascade of preprocessed variants of the
//! normalized frame. Several full detection passes per call make it far
//! too slow for the live loop, so only the still-image chain uses it.

use super::preprocess::{add_quiet_zone, box_blur, contrast_stretch, invert, otsu_threshold};
use super::software::{decode_bitmap, decode_greyscale};
use super::strategy::{DecodeStrategy, StrategyError, StrategyKind};
use crate::normalize::NormalizedFrame;

/// Preprocessing variants, tried in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Stretch the histogram to the full range.
    ContrastStretch,
    /// Binarize at Otsu's threshold.
    Otsu,
    /// Light blur, for textured or noisy prints.
    Blur,
    /// Light-on-dark codes.
    Inverted,
    /// White border around tightly cropped codes.
    QuietZone,
}

const CASCADE: [Variant; 5] = [
    Variant::ContrastStretch,
    Variant::Otsu,
    Variant::Blur,
    Variant::Inverted,
    Variant::QuietZone,
];

/// Secondary decoder trying each [`Variant`] until one decodes.
#[derive(Debug, Clone)]
pub struct SecondarySoftwareDecoder {
    variants: Vec<Variant>,
}

impl SecondarySoftwareDecoder {
    pub fn new() -> Self {
        Self {
            variants: CASCADE.to_vec(),
        }
    }

    /// Uses a custom cascade.
    pub fn with_variants(variants: Vec<Variant>) -> Self {
        Self { variants }
    }

    fn run_variant(
        variant: Variant,
        grey: &[u8],
        width: usize,
        height: usize,
    ) -> Result<Option<String>, StrategyError> {
        match variant {
            Variant::ContrastStretch => decode_greyscale(&contrast_stretch(grey), width, height),
            Variant::Otsu => decode_bitmap(grey, width, height, otsu_threshold(grey)),
            Variant::Blur => decode_greyscale(&box_blur(grey, width, height), width, height),
            Variant::Inverted => decode_greyscale(&invert(grey), width, height),
            Variant::QuietZone => {
                let pad = (width.min(height) / 10).max(8);
                let (padded, w, h) = add_quiet_zone(grey, width, height, pad);
                decode_greyscale(&padded, w, h)
            }
        }
    }
}

impl Default for SecondarySoftwareDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeStrategy for SecondarySoftwareDecoder {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SecondarySoftware
    }

    fn decode(&self, frame: &NormalizedFrame) -> Result<Option<String>, StrategyError> {
        let buffer = frame.buffer();
        let grey = buffer.to_luma();
        let (width, height) = (buffer.width() as usize, buffer.height() as usize);

        for &variant in &self.variants {
            match Self::run_variant(variant, &grey, width, height) {
                Ok(Some(text)) => {
                    tracing::debug!(?variant, "Secondary decoder matched");
                    return Ok(Some(text));
                }
                Ok(None) => {}
                Err(e) => tracing::trace!(?variant, error = %e, "Variant failed"),
            }
        }
        Ok(None)
    }
}
