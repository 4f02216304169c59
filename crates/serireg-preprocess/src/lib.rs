//! Preprocessor (C3): reduces each slide's scaled image to a normalized,
//! single-channel 8-bit image plus a tissue mask, per the modality-aware
//! policy of SPEC_FULL.md §4.3.

pub mod brightfield;
pub mod convert;
pub mod denoise;
pub mod fluorescence;
pub mod mask_ops;
pub mod normalize;
pub mod size_contract;

use {ndarray::{Array2, Array3}, serireg_slide::Modality};

pub const DEFAULT_MIN_MASK_AREA_FRACTION: f64 = 0.02;
pub const DEFAULT_DENOISE_RADIUS: usize = 2;
pub const DEFAULT_CLAHE_TILES_PER_AXIS: usize = 8;

/// The per-slide output of C3, before pooled normalization is applied.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// Normalized single-channel image used for non-rigid alignment and
    /// for every downstream thumbnail.
    pub processed: Array2<u8>,
    /// `processed` after the edge-preserving denoise pass; used only for
    /// feature detection / rigid alignment, per §4.3.
    pub denoised_for_rigid: Array2<u8>,
    pub mask: Array2<u8>,
}

/// Run the modality-appropriate reduction (before pooled normalization,
/// which operates across the whole set and is applied separately via
/// `normalize::normalize_to_target`).
pub fn preprocess(img_u16: &Array3<u16>, modality: Modality, dapi_channel: usize) -> Preprocessed {
    let img_u8 = convert::to_u8(img_u16);
    let processed = match modality {
        Modality::Brightfield => brightfield::colorfulness_score(&img_u8),
        Modality::Fluorescence => {
            let raw_channel = fluorescence::fluorescence_channel(&img_u8, dapi_channel);
            fluorescence::adaptive_histogram_equalize(&raw_channel, DEFAULT_CLAHE_TILES_PER_AXIS)
        }
    };
    let mask = match modality {
        Modality::Brightfield => brightfield::brightfield_mask(&img_u8, DEFAULT_MIN_MASK_AREA_FRACTION),
        Modality::Fluorescence => fluorescence::fluorescence_mask(&processed, DEFAULT_MIN_MASK_AREA_FRACTION),
    };
    let denoised_for_rigid = denoise::bilateral_denoise(&processed, DEFAULT_DENOISE_RADIUS, 2.0, 20.0);
    Preprocessed { processed, denoised_for_rigid, mask }
}

pub use normalize::{normalize_to_target, pool_stats, NormalizationMode, TargetStats};
pub use size_contract::{resolve_size_budget, SizeBudget};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightfield_pipeline_produces_matching_shapes() {
        let img = Array3::<u16>::from_elem((3, 32, 32), 4000);
        let out = preprocess(&img, Modality::Brightfield, 0);
        assert_eq!(out.processed.dim(), (32, 32));
        assert_eq!(out.mask.dim(), (32, 32));
    }

    #[test]
    fn fluorescence_pipeline_produces_matching_shapes() {
        let img = Array3::<u16>::from_elem((4, 32, 32), 2000);
        let out = preprocess(&img, Modality::Fluorescence, 0);
        assert_eq!(out.processed.dim(), (32, 32));
        assert_eq!(out.denoised_for_rigid.dim(), (32, 32));
    }
}
