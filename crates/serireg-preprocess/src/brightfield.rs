//! Brightfield policy: a color-deconvolution-like "colorfulness" score
//! that runs high on stained tissue and low on the bright, near-neutral
//! slide background (SPEC_FULL.md §4.3).

use {crate::mask_ops::threshold_with_relaxation, ndarray::Array2, ndarray::Array3};

/// Per-pixel chroma (max channel minus min channel) as a stand-in for a
/// full stain-vector deconvolution: stained tissue departs from neutral
/// gray/white far more than the glass background does.
pub fn colorfulness_score(img_u8: &Array3<u8>) -> Array2<u8> {
    let (channels, rows, cols) = img_u8.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let mut lo = 255u8;
        let mut hi = 0u8;
        for ch in 0..channels {
            let v = img_u8[[ch, r, c]];
            lo = lo.min(v);
            hi = hi.max(v);
        }
        hi.saturating_sub(lo)
    })
}

pub fn brightfield_mask(img_u8: &Array3<u8>, min_area_fraction: f64) -> Array2<u8> {
    let score = colorfulness_score(img_u8);
    threshold_with_relaxation(&score, min_area_fraction, 0.5, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_background_scores_low() {
        let img = Array3::<u8>::from_elem((3, 4, 4), 230);
        let score = colorfulness_score(&img);
        assert!(score.iter().all(|&v| v == 0));
    }

    #[test]
    fn saturated_pixel_scores_high() {
        let mut img = Array3::<u8>::from_elem((3, 2, 2), 230);
        img[[0, 0, 0]] = 200;
        img[[1, 0, 0]] = 40;
        img[[2, 0, 0]] = 180;
        let score = colorfulness_score(&img);
        assert_eq!(score[[0, 0]], 160);
    }
}
