//! Tissue-union mask for the non-rigid solver (§4.6): "a tissue-union mask
//! derived from rigid masks with the same hysteresis rule as the overlap
//! crop."

use ndarray::Array2;
use serireg_warp::{overlap_crop_mask, BboxXywh};

/// Derive the solver's working region from the rigidly-warped per-slide
/// masks. Reuses `serireg_warp::crop::overlap_crop_mask` directly so the
/// hysteresis/hole-fill/fallback rule is defined exactly once.
pub fn nr_bbox(warped_masks: &[Array2<u8>], reference_mask: &Array2<u8>) -> (Array2<u8>, BboxXywh) {
    overlap_crop_mask(warped_masks, reference_mask)
}

/// Crop `img` to `bbox`, the input used for the actual solver call.
pub fn crop_to_bbox(img: &Array2<u8>, bbox: BboxXywh) -> Array2<u8> {
    img.slice(ndarray::s![bbox.y as usize..(bbox.y + bbox.h) as usize, bbox.x as usize..(bbox.x + bbox.w) as usize]).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_to_bbox_extracts_expected_region() {
        let mut img = Array2::<u8>::zeros((10, 10));
        for r in 2..6 {
            for c in 3..7 {
                img[[r, c]] = 100;
            }
        }
        let bbox = BboxXywh { x: 3, y: 2, w: 4, h: 4 };
        let cropped = crop_to_bbox(&img, bbox);
        assert_eq!(cropped.dim(), (4, 4));
        assert!(cropped.iter().all(|&v| v == 100));
    }
}
