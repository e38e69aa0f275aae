//! Single-pass decoding of uploaded images.

use crate::config::DecodeConfig;
use crate::decode::{Capabilities, ChainMatch, DecodeChain};
use crate::error::ScanError;
use crate::normalize::{FrameInput, Normalizer};

/// Decodes an encoded image (PNG, JPEG, WebP, GIF or BMP) with the default
/// static chain.
///
/// Resolves exactly once: the chain runs a single time and there is no
/// retry. Empty or undecodable bytes are [`ScanError::InvalidInput`], an
/// image without a readable code is [`ScanError::NoCodeFound`].
pub fn decode_static_image(bytes: &[u8]) -> Result<String, ScanError> {
    let config = DecodeConfig::default();
    decode_static_image_with(
        bytes,
        &DecodeChain::still(&Capabilities::none(), config.enable_secondary),
        &Normalizer::still(&config),
    )
}

/// Decodes an encoded image with a caller-supplied chain and normalizer.
pub fn decode_static_image_with(
    bytes: &[u8],
    chain: &DecodeChain,
    normalizer: &Normalizer,
) -> Result<String, ScanError> {
    decode_still(bytes, chain, normalizer).map(|hit| hit.text)
}

pub(crate) fn decode_still(
    bytes: &[u8],
    chain: &DecodeChain,
    normalizer: &Normalizer,
) -> Result<ChainMatch, ScanError> {
    if bytes.is_empty() {
        return Err(ScanError::InvalidInput("image is empty".into()));
    }
    let image = image::load_from_memory(bytes)
        .map_err(|e| ScanError::InvalidInput(format!("unreadable image: {e}")))?;
    let frame = normalizer
        .normalize(FrameInput::Still(&image))?
        .ok_or_else(|| ScanError::InvalidInput("image has no pixels".into()))?;

    tracing::debug!(
        width = image.width(),
        height = image.height(),
        scaled = frame.was_scaled(),
        "Decoding still image"
    );

    chain.decode(&frame).ok_or(ScanError::NoCodeFound)
}
