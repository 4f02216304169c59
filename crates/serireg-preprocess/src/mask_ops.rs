//! Thresholding and morphological cleanup shared by both preprocessing
//! policies to turn a scalar score image into a binary tissue mask.

use ndarray::Array2;

/// Otsu's method: the threshold that minimizes intra-class variance over
/// the 256-bin histogram of `img`.
pub fn otsu_threshold(img: &Array2<u8>) -> u8 {
    let mut hist = [0u32; 256];
    for &v in img.iter() {
        hist[v as usize] += 1;
    }
    let total = img.len() as f64;
    let sum_all: f64 = hist.iter().enumerate().map(|(i, &c)| i as f64 * c as f64).sum();
    let mut sum_bg = 0.0;
    let mut weight_bg = 0.0;
    let mut best_thresh = 0u8;
    let mut best_variance = -1.0f64;
    for t in 0..256 {
        weight_bg += hist[t] as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg <= 0.0 {
            break;
        }
        sum_bg += t as f64 * hist[t] as f64;
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let between = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);
        if between > best_variance {
            best_variance = between;
            best_thresh = t as u8;
        }
    }
    best_thresh
}

pub fn threshold_above(img: &Array2<u8>, thresh: u8) -> Array2<u8> {
    img.mapv(|v| if v > thresh { 255 } else { 0 })
}

/// Morphological closing (dilate then erode) with a square structuring
/// element of side `2*radius+1`, closing small holes and gaps in the
/// tissue mask left by thresholding.
pub fn morphological_close(mask: &Array2<u8>, radius: usize) -> Array2<u8> {
    erode(&dilate(mask, radius), radius)
}

fn dilate(mask: &Array2<u8>, radius: usize) -> Array2<u8> {
    let (rows, cols) = mask.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let r0 = r.saturating_sub(radius);
        let r1 = (r + radius).min(rows - 1);
        let c0 = c.saturating_sub(radius);
        let c1 = (c + radius).min(cols - 1);
        let any = (r0..=r1).any(|rr| (c0..=c1).any(|cc| mask[[rr, cc]] > 0));
        if any {
            255
        } else {
            0
        }
    })
}

fn erode(mask: &Array2<u8>, radius: usize) -> Array2<u8> {
    let (rows, cols) = mask.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let r0 = r.saturating_sub(radius);
        let r1 = (r + radius).min(rows - 1);
        let c0 = c.saturating_sub(radius);
        let c1 = (c + radius).min(cols - 1);
        let all = (r0..=r1).all(|rr| (c0..=c1).all(|cc| mask[[rr, cc]] > 0));
        if all {
            255
        } else {
            0
        }
    })
}

pub fn foreground_fraction(mask: &Array2<u8>) -> f64 {
    let fg = mask.iter().filter(|&&v| v > 0).count() as f64;
    fg / mask.len() as f64
}

/// Threshold with one relaxation retry if the resulting mask covers too
/// little of the image (SPEC_FULL.md §4.3/§11.2): lowering the effective
/// Otsu cut by `relax_fraction` of the full 0-255 range once.
pub fn threshold_with_relaxation(score: &Array2<u8>, min_area_fraction: f64, relax_fraction: f64, close_radius: usize) -> Array2<u8> {
    let thresh = otsu_threshold(score);
    let mask = morphological_close(&threshold_above(score, thresh), close_radius);
    if foreground_fraction(&mask) >= min_area_fraction {
        return mask;
    }
    let relaxed_thresh = (thresh as f64 * (1.0 - relax_fraction)).round().clamp(0.0, 255.0) as u8;
    morphological_close(&threshold_above(score, relaxed_thresh), close_radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otsu_splits_bimodal_histogram() {
        let mut img = Array2::<u8>::zeros((10, 10));
        for r in 5..10 {
            for c in 0..10 {
                img[[r, c]] = 250;
            }
        }
        let thresh = otsu_threshold(&img);
        assert!(thresh > 0 && thresh < 250);
    }

    #[test]
    fn closing_fills_small_gap() {
        let mut mask = Array2::<u8>::from_elem((7, 7), 255);
        mask[[3, 3]] = 0;
        let closed = morphological_close(&mask, 1);
        assert_eq!(closed[[3, 3]], 255);
    }

    #[test]
    fn relaxation_retry_grows_undersized_mask() {
        let mut score = Array2::<u8>::from_elem((20, 20), 10);
        for r in 0..2 {
            for c in 0..2 {
                score[[r, c]] = 200;
            }
        }
        let strict = threshold_with_relaxation(&score, 0.5, 0.0, 0);
        let relaxed = threshold_with_relaxation(&score, 0.5, 0.5, 0);
        assert!(foreground_fraction(&relaxed) >= foreground_fraction(&strict));
    }
}
