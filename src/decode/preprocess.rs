//! Greyscale preprocessing used by the secondary decoder.
//!
//! All functions operate on flat row-major luma planes.

/// Stretches values to fill the full [0, 255] range.
pub(crate) fn contrast_stretch(grey: &[u8]) -> Vec<u8> {
    let (lo, hi) = grey
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &p| (lo.min(p), hi.max(p)));
    let range = hi.saturating_sub(lo) as u32;
    if range == 0 {
        return grey.to_vec();
    }
    grey.iter()
        .map(|&p| ((p.saturating_sub(lo) as u32 * 255) / range) as u8)
        .collect()
}

/// Swaps dark and light, for light-on-dark codes.
pub(crate) fn invert(grey: &[u8]) -> Vec<u8> {
    grey.iter().map(|&p| 255 - p).collect()
}

/// Separable [1, 2, 1] / 4 blur, one pass.
pub(crate) fn box_blur(grey: &[u8], width: usize, height: usize) -> Vec<u8> {
    if width < 3 || height < 3 {
        return grey.to_vec();
    }

    let mut horizontal = vec![0u8; grey.len()];
    for y in 0..height {
        let row = &grey[y * width..(y + 1) * width];
        for x in 0..width {
            let left = row[x.saturating_sub(1)] as u16;
            let right = row[(x + 1).min(width - 1)] as u16;
            horizontal[y * width + x] = ((left + 2 * row[x] as u16 + right) / 4) as u8;
        }
    }

    let mut out = vec![0u8; grey.len()];
    for y in 0..height {
        let up = y.saturating_sub(1);
        let down = (y + 1).min(height - 1);
        for x in 0..width {
            let sum = horizontal[up * width + x] as u16
                + 2 * horizontal[y * width + x] as u16
                + horizontal[down * width + x] as u16;
            out[y * width + x] = (sum / 4) as u8;
        }
    }
    out
}

/// Surrounds the plane with a white border.
///
/// Restores the quiet zone of codes cropped tight against the image edge.
pub(crate) fn add_quiet_zone(
    grey: &[u8],
    width: usize,
    height: usize,
    pad: usize,
) -> (Vec<u8>, usize, usize) {
    let padded_width = width + 2 * pad;
    let padded_height = height + 2 * pad;
    let mut out = vec![255u8; padded_width * padded_height];
    for y in 0..height {
        let dst = (y + pad) * padded_width + pad;
        out[dst..dst + width].copy_from_slice(&grey[y * width..(y + 1) * width]);
    }
    (out, padded_width, padded_height)
}

/// Otsu's global threshold: the split that maximizes between-class variance.
pub(crate) fn otsu_threshold(grey: &[u8]) -> u8 {
    let mut hist = [0u64; 256];
    for &p in grey {
        hist[p as usize] += 1;
    }

    let total = grey.len() as f64;
    let sum_all: f64 = hist.iter().enumerate().map(|(i, &c)| i as f64 * c as f64).sum();

    let mut best_threshold = 0u8;
    let mut best_variance = 0.0f64;
    let mut weight_bg = 0.0f64;
    let mut sum_bg = 0.0f64;

    for (t, &count) in hist.iter().enumerate() {
        weight_bg += count as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0.0 {
            break;
        }

        sum_bg += t as f64 * count as f64;
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let between = weight_bg * weight_fg * (mean_bg - mean_fg) * (mean_bg - mean_fg);
        if between > best_variance {
            best_variance = between;
            best_threshold = t as u8;
        }
    }

    // Pixels strictly below the threshold are dark; include the boundary bin.
    best_threshold.saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contrast_stretch_expands_range() {
        let out = contrast_stretch(&[100, 150, 200]);
        assert_eq!(out, vec![0, 127, 255]);
    }

    #[test]
    fn test_contrast_stretch_flat_unchanged() {
        assert_eq!(contrast_stretch(&[7, 7, 7]), vec![7, 7, 7]);
    }

    #[test]
    fn test_otsu_splits_bimodal() {
        let mut grey = vec![20u8; 500];
        grey.extend(vec![230u8; 500]);
        let t = otsu_threshold(&grey);
        assert!(t > 20 && t <= 230);
    }

    #[test]
    fn test_quiet_zone_border_is_white() {
        let (out, w, h) = add_quiet_zone(&[0, 0, 0, 0], 2, 2, 1);
        assert_eq!((w, h), (4, 4));
        assert_eq!(out[0], 255);
        assert_eq!(out[w + 1], 0);
    }

    #[test]
    fn test_blur_preserves_flat_plane() {
        let grey = vec![90u8; 25];
        assert_eq!(box_blur(&grey, 5, 5), grey);
    }
}
