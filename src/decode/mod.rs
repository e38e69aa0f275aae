//! Strategy-fallback QR decoding.
//!
//! A [`DecodeChain`] holds a fixed, ordered list of strategies and returns
//! the first payload any of them produces:
//!
//! ```text
//! native detector (if probed) → software matrix → secondary (stills only)
//! ```
//!
//! Each strategy call is isolated: errors and panics inside a backend
//! count as "no match", so one misbehaving backend never aborts a scan.

mod native;
mod preprocess;
mod secondary;
mod software;
mod strategy;

pub use native::{BarcodeDetector, BarcodeFormat, Capabilities, DetectedBarcode, NativeDetector};
pub use secondary::{SecondarySoftwareDecoder, Variant};
pub use software::SoftwareMatrixDecoder;
pub use strategy::{DecodeStrategy, StrategyError, StrategyKind};

use crate::normalize::{NormalizedFrame, PixelBuffer};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// A successful chain decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainMatch {
    /// Decoded payload.
    pub text: String,
    /// Strategy that produced it.
    pub strategy: StrategyKind,
}

/// Ordered list of decode strategies.
pub struct DecodeChain {
    strategies: Vec<Box<dyn DecodeStrategy>>,
}

impl DecodeChain {
    /// Creates a chain that tries `strategies` in the given order.
    pub fn new(strategies: Vec<Box<dyn DecodeStrategy>>) -> Self {
        Self { strategies }
    }

    /// Chain for the live camera loop: native (when available), then software.
    pub fn live(capabilities: &Capabilities) -> Self {
        let mut strategies: Vec<Box<dyn DecodeStrategy>> = Vec::with_capacity(2);
        if let Some(detector) = capabilities.native_detector() {
            strategies.push(Box::new(NativeDetector::new(detector)));
        }
        strategies.push(Box::new(SoftwareMatrixDecoder::new()));
        Self::new(strategies)
    }

    /// Chain for one-shot still images; appends the secondary decoder when
    /// `secondary` is set.
    pub fn still(capabilities: &Capabilities, secondary: bool) -> Self {
        let mut chain = Self::live(capabilities);
        if secondary {
            chain.strategies.push(Box::new(SecondarySoftwareDecoder::new()));
        }
        chain
    }

    /// Strategy kinds in the order they are tried.
    pub fn kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Runs every strategy in order and returns the first match.
    pub fn decode(&self, frame: &NormalizedFrame) -> Option<ChainMatch> {
        for strategy in &self.strategies {
            let kind = strategy.kind();
            match catch_unwind(AssertUnwindSafe(|| strategy.decode(frame))) {
                Ok(Ok(Some(text))) => {
                    tracing::debug!(strategy = %kind, "Decoded payload");
                    return Some(ChainMatch {
                        text,
                        strategy: kind,
                    });
                }
                Ok(Ok(None)) => tracing::trace!(strategy = %kind, "No match"),
                Ok(Err(e)) => tracing::debug!(strategy = %kind, error = %e, "Strategy failed"),
                Err(_) => tracing::debug!(strategy = %kind, "Strategy panicked"),
            }
        }
        None
    }
}

impl std::fmt::Debug for DecodeChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeChain")
            .field("strategies", &self.kinds())
            .finish()
    }
}

/// Decodes a normalized buffer with the software live chain.
///
/// Pure and side-effect free: no native capability, no preprocessing.
pub fn decode_frame(buffer: &PixelBuffer) -> Option<String> {
    DecodeChain::live(&Capabilities::none())
        .decode(&NormalizedFrame::from_buffer(buffer.clone()))
        .map(|hit| hit.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::PixelFormat;
    use crate::test_support::qr_gray;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Stub {
        kind: StrategyKind,
        answer: Option<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    impl Stub {
        fn boxed(
            kind: StrategyKind,
            answer: Option<&'static str>,
            calls: &Arc<AtomicUsize>,
        ) -> Box<dyn DecodeStrategy> {
            Box::new(Self {
                kind,
                answer,
                calls: Arc::clone(calls),
            })
        }
    }

    impl DecodeStrategy for Stub {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        fn decode(&self, _frame: &NormalizedFrame) -> Result<Option<String>, StrategyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer.map(str::to_owned))
        }
    }

    struct Exploding;

    impl DecodeStrategy for Exploding {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Native
        }

        fn decode(&self, _frame: &NormalizedFrame) -> Result<Option<String>, StrategyError> {
            panic!("backend blew up");
        }
    }

    struct Failing;

    impl DecodeStrategy for Failing {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Native
        }

        fn decode(&self, _frame: &NormalizedFrame) -> Result<Option<String>, StrategyError> {
            Err(StrategyError::Detector("device lost".into()))
        }
    }

    fn blank() -> NormalizedFrame {
        NormalizedFrame::from_buffer(
            PixelBuffer::new(8, 8, PixelFormat::Gray8, vec![255u8; 64]).unwrap(),
        )
    }

    #[test]
    fn test_native_wins_over_software() {
        let native_calls = Arc::new(AtomicUsize::new(0));
        let software_calls = Arc::new(AtomicUsize::new(0));
        let chain = DecodeChain::new(vec![
            Stub::boxed(StrategyKind::Native, Some("from-native"), &native_calls),
            Stub::boxed(StrategyKind::SoftwareMatrix, Some("from-software"), &software_calls),
        ]);

        let hit = chain.decode(&blank()).unwrap();
        assert_eq!(hit.text, "from-native");
        assert_eq!(hit.strategy, StrategyKind::Native);
        assert_eq!(software_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_falls_through_on_miss() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = DecodeChain::new(vec![
            Stub::boxed(StrategyKind::Native, None, &calls),
            Stub::boxed(StrategyKind::SoftwareMatrix, Some("second"), &calls),
        ]);

        assert_eq!(chain.decode(&blank()).unwrap().text, "second");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panics_and_errors_become_no_match() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = DecodeChain::new(vec![
            Box::new(Exploding),
            Box::new(Failing),
            Stub::boxed(StrategyKind::SoftwareMatrix, Some("survivor"), &calls),
        ]);

        assert_eq!(chain.decode(&blank()).unwrap().text, "survivor");
    }

    #[test]
    fn test_chain_order() {
        assert_eq!(
            DecodeChain::live(&Capabilities::none()).kinds(),
            vec![StrategyKind::SoftwareMatrix]
        );
        assert_eq!(
            DecodeChain::still(&Capabilities::none(), true).kinds(),
            vec![StrategyKind::SoftwareMatrix, StrategyKind::SecondarySoftware]
        );
    }

    #[test]
    fn test_decode_frame_hello() {
        let buffer = PixelBuffer::from_gray(qr_gray("HELLO", 200));
        assert_eq!((buffer.width(), buffer.height()), (200, 200));
        assert_eq!(decode_frame(&buffer).as_deref(), Some("HELLO"));
    }

    #[test]
    fn test_decode_frame_blank_white() {
        let buffer =
            PixelBuffer::new(200, 200, PixelFormat::Rgba8, vec![255u8; 200 * 200 * 4]).unwrap();
        assert_eq!(decode_frame(&buffer), None);
    }
}
