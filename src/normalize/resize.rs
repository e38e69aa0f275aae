//! Aspect-preserving downsampling.

use super::{PixelBuffer, PixelFormat};
use image::imageops::{self, FilterType};

/// Calculates dimensions that fit within `max_edge` while preserving aspect ratio.
///
/// Images that already fit keep their size. Neither edge drops below one
/// pixel, and a `max_edge` of zero is treated as one.
pub fn fit_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let max_edge = max_edge.max(1);
    if width == 0 || height == 0 {
        return (0, 0);
    }
    let longest = width.max(height);
    if longest <= max_edge {
        return (width, height);
    }

    let scale = max_edge as f64 / longest as f64;
    let scaled = |edge: u32| ((edge as f64 * scale).round() as u32).clamp(1, max_edge);
    (scaled(width), scaled(height))
}

/// Downsamples `buffer` so that its longest edge is at most `max_edge`.
///
/// Returns `None` when the buffer already fits.
pub fn downscale_to_fit(buffer: &PixelBuffer, max_edge: u32) -> Option<PixelBuffer> {
    let (width, height) = fit_dimensions(buffer.width(), buffer.height(), max_edge);
    if (width, height) == (buffer.width(), buffer.height()) {
        return None;
    }

    let scaled = match buffer.format() {
        PixelFormat::Gray8 => {
            let source = buffer.clone().into_gray_image()?;
            PixelBuffer::from_gray(imageops::resize(&source, width, height, FilterType::Triangle))
        }
        PixelFormat::Rgb8 | PixelFormat::Rgba8 => {
            let source = buffer.clone().into_rgba().into_rgba_image()?;
            PixelBuffer::from_rgba(imageops::resize(&source, width, height, FilterType::Triangle))
        }
    };

    tracing::trace!(
        from_width = buffer.width(),
        from_height = buffer.height(),
        to_width = width,
        to_height = height,
        "Downscaled frame"
    );
    Some(scaled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fits_unchanged() {
        assert_eq!(fit_dimensions(800, 600, 1600), (800, 600));
    }

    #[test]
    fn test_landscape_constrained_by_width() {
        assert_eq!(fit_dimensions(4000, 3000, 1600), (1600, 1200));
    }

    #[test]
    fn test_portrait_constrained_by_height() {
        assert_eq!(fit_dimensions(1080, 1920, 800), (450, 800));
    }

    #[test]
    fn test_extreme_strip_keeps_one_pixel() {
        assert_eq!(fit_dimensions(10_000, 2, 100), (100, 1));
    }

    #[test]
    fn test_zero_max_edge_collapses_to_one_pixel() {
        assert_eq!(fit_dimensions(10, 10, 0), (1, 1));
        assert_eq!(fit_dimensions(1, 1, 0), (1, 1));

        let buffer = PixelBuffer::new(4, 2, PixelFormat::Gray8, vec![9u8; 8]).unwrap();
        let scaled = downscale_to_fit(&buffer, 0).unwrap();
        assert_eq!((scaled.width(), scaled.height()), (1, 1));
    }

    #[test]
    fn test_downscale_gray() {
        let buffer =
            PixelBuffer::new(400, 200, PixelFormat::Gray8, vec![200u8; 400 * 200]).unwrap();
        let scaled = downscale_to_fit(&buffer, 100).unwrap();

        assert_eq!((scaled.width(), scaled.height()), (100, 50));
        assert_eq!(scaled.format(), PixelFormat::Gray8);
        assert!(scaled.data().iter().all(|&v| v == 200));
    }

    #[test]
    fn test_downscale_rgb_becomes_rgba() {
        let buffer =
            PixelBuffer::new(300, 300, PixelFormat::Rgb8, vec![10u8; 300 * 300 * 3]).unwrap();
        let scaled = downscale_to_fit(&buffer, 150).unwrap();

        assert_eq!(scaled.format(), PixelFormat::Rgba8);
        assert_eq!((scaled.width(), scaled.height()), (150, 150));
    }

    #[test]
    fn test_no_downscale_when_fitting() {
        let buffer = PixelBuffer::new(10, 10, PixelFormat::Gray8, vec![0u8; 100]).unwrap();
        assert!(downscale_to_fit(&buffer, 64).is_none());
    }

    proptest! {
        #[test]
        fn prop_fit_respects_bound_and_ratio(
            width in 1u32..8000,
            height in 1u32..8000,
            max_edge in 0u32..2000,
        ) {
            let (w, h) = fit_dimensions(width, height, max_edge);
            let max_edge = max_edge.max(1);
            prop_assert!(w >= 1 && h >= 1);
            prop_assert!(w.max(h) <= max_edge);

            if width.max(height) > max_edge {
                prop_assert_eq!(w.max(h), max_edge);
                // Rounding moves the short edge by at most one pixel.
                let longest = width.max(height) as f64;
                let expected = width.min(height) as f64 * max_edge as f64 / longest;
                prop_assert!((w.min(h) as f64 - expected).abs() <= 1.0);
            } else {
                prop_assert_eq!((w, h), (width, height));
            }
        }
    }
}
