//! Platform barcode detection.
//!
//! Some runtimes ship a hardware-accelerated barcode detector. The host
//! exposes it through [`BarcodeDetector`]; a session probes it once and
//! caches the outcome in [`Capabilities`].

use super::strategy::{DecodeStrategy, StrategyError, StrategyKind};
use crate::normalize::{NormalizedFrame, PixelBuffer};
use std::sync::Arc;

/// Symbologies a detector may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarcodeFormat {
    QrCode,
    DataMatrix,
    Aztec,
    Pdf417,
    Ean13,
    Code128,
    Other,
}

/// A code found by a platform detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedBarcode {
    /// Symbology of the code.
    pub format: BarcodeFormat,
    /// Decoded payload.
    pub raw_value: String,
}

/// A platform barcode detection capability.
pub trait BarcodeDetector: Send + Sync {
    /// Formats this detector can recognize.
    fn supported_formats(&self) -> Vec<BarcodeFormat>;

    /// Detects codes in `image`, which is never downsampled.
    fn detect(&self, image: &PixelBuffer) -> Result<Vec<DetectedBarcode>, StrategyError>;
}

/// Capabilities found by probing the runtime.
#[derive(Clone, Default)]
pub struct Capabilities {
    native: Option<Arc<dyn BarcodeDetector>>,
}

impl Capabilities {
    /// No platform capabilities; software decoding only.
    pub fn none() -> Self {
        Self::default()
    }

    /// Probes `detector`, keeping it only if it can read QR codes.
    pub fn probe(detector: Option<Arc<dyn BarcodeDetector>>) -> Self {
        let native = detector.filter(|d| {
            let supports_qr = d.supported_formats().contains(&BarcodeFormat::QrCode);
            if !supports_qr {
                tracing::info!("Native detector present but lacks QR support");
            }
            supports_qr
        });
        tracing::info!(native = native.is_some(), "Probed decode capabilities");
        Self { native }
    }

    /// Returns true if a usable native detector was found.
    pub fn has_native(&self) -> bool {
        self.native.is_some()
    }

    pub(crate) fn native_detector(&self) -> Option<Arc<dyn BarcodeDetector>> {
        self.native.clone()
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("native", &self.has_native())
            .finish()
    }
}

/// Strategy adapter around a platform detector.
pub struct NativeDetector {
    detector: Arc<dyn BarcodeDetector>,
}

impl NativeDetector {
    pub fn new(detector: Arc<dyn BarcodeDetector>) -> Self {
        Self { detector }
    }
}

impl DecodeStrategy for NativeDetector {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Native
    }

    fn decode(&self, frame: &NormalizedFrame) -> Result<Option<String>, StrategyError> {
        let codes = self.detector.detect(frame.source())?;
        Ok(codes
            .into_iter()
            .find(|code| code.format == BarcodeFormat::QrCode && !code.raw_value.is_empty())
            .map(|code| code.raw_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::PixelFormat;

    struct FixedDetector {
        formats: Vec<BarcodeFormat>,
        codes: Vec<DetectedBarcode>,
    }

    impl BarcodeDetector for FixedDetector {
        fn supported_formats(&self) -> Vec<BarcodeFormat> {
            self.formats.clone()
        }

        fn detect(&self, _image: &PixelBuffer) -> Result<Vec<DetectedBarcode>, StrategyError> {
            Ok(self.codes.clone())
        }
    }

    fn frame() -> NormalizedFrame {
        NormalizedFrame::from_buffer(
            PixelBuffer::new(2, 2, PixelFormat::Gray8, vec![255u8; 4]).unwrap(),
        )
    }

    #[test]
    fn test_probe_requires_qr_support() {
        let detector: Arc<dyn BarcodeDetector> = Arc::new(FixedDetector {
            formats: vec![BarcodeFormat::Ean13],
            codes: Vec::new(),
        });
        assert!(!Capabilities::probe(Some(detector)).has_native());
        assert!(!Capabilities::probe(None).has_native());
    }

    #[test]
    fn test_native_skips_other_symbologies_and_empty_values() {
        let strategy = NativeDetector::new(Arc::new(FixedDetector {
            formats: vec![BarcodeFormat::QrCode],
            codes: vec![
                DetectedBarcode {
                    format: BarcodeFormat::Ean13,
                    raw_value: "4006381333931".into(),
                },
                DetectedBarcode {
                    format: BarcodeFormat::QrCode,
                    raw_value: String::new(),
                },
                DetectedBarcode {
                    format: BarcodeFormat::QrCode,
                    raw_value: "otpauth://totp/x".into(),
                },
            ],
        }));

        assert_eq!(
            strategy.decode(&frame()).unwrap().as_deref(),
            Some("otpauth://totp/x")
        );
    }
}
