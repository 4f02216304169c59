//! The feature detector capability interface (§6 "Feature detector
//! (consumed)"). Concrete detectors are out of scope; this crate supplies
//! only the trait and a deterministic synthetic implementation for tests.

use {
    crate::types::FeatureSet,
    ndarray::Array2,
    rand::{Rng, SeedableRng},
    rand_chacha::ChaCha8Rng,
};

pub trait FeatureDetector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Detect keypoints and describe them. Implementations that admit
    /// randomness must be fully determined by `seed` (§5, §9(c)).
    fn detect(&self, img: &Array2<u8>, seed: u64) -> FeatureSet;
}

/// A grid-sampling detector: keypoints sit on a jittered regular grid,
/// descriptors are the flattened local patch around each keypoint. Good
/// enough to exercise matching/ordering/rigid-fit logic deterministically
/// without depending on a real feature library.
pub struct GridPatchDetector {
    pub spacing: usize,
    pub patch_radius: usize,
    pub jitter: usize,
}

impl Default for GridPatchDetector {
    fn default() -> Self {
        Self { spacing: 24, patch_radius: 4, jitter: 3 }
    }
}

impl FeatureDetector for GridPatchDetector {
    fn name(&self) -> &'static str {
        "grid-patch-detector"
    }

    fn detect(&self, img: &Array2<u8>, seed: u64) -> FeatureSet {
        let (rows, cols) = img.dim();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let margin = self.patch_radius + self.jitter + 1;
        let mut keypoints = Vec::new();
        let mut descriptors = Vec::new();
        if rows <= 2 * margin || cols <= 2 * margin {
            return FeatureSet { keypoints, descriptors };
        }
        let mut y = margin;
        while y < rows - margin {
            let mut x = margin;
            while x < cols - margin {
                let jx = (x as i64 + rng.gen_range(-(self.jitter as i64)..=(self.jitter as i64))).clamp(margin as i64, (cols - margin - 1) as i64) as usize;
                let jy = (y as i64 + rng.gen_range(-(self.jitter as i64)..=(self.jitter as i64))).clamp(margin as i64, (rows - margin - 1) as i64) as usize;
                let patch = patch_descriptor(img, jx, jy, self.patch_radius);
                keypoints.push([jx as f32, jy as f32]);
                descriptors.push(patch);
                x += self.spacing;
            }
            y += self.spacing;
        }
        FeatureSet { keypoints, descriptors }
    }
}

fn patch_descriptor(img: &Array2<u8>, x: usize, y: usize, radius: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity((2 * radius + 1) * (2 * radius + 1));
    for dy in -(radius as i64)..=(radius as i64) {
        for dx in -(radius as i64)..=(radius as i64) {
            let py = (y as i64 + dy) as usize;
            let px = (x as i64 + dx) as usize;
            out.push(img[[py, px]] as f32);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_is_deterministic() {
        let img = Array2::from_shape_fn((100, 100), |(r, c)| ((r + c) % 256) as u8);
        let detector = GridPatchDetector::default();
        let a = detector.detect(&img, 7);
        let b = detector.detect(&img, 7);
        assert_eq!(a.keypoints, b.keypoints);
    }

    #[test]
    fn different_seeds_can_jitter_differently() {
        let img = Array2::from_shape_fn((100, 100), |(r, c)| ((r + c) % 256) as u8);
        let detector = GridPatchDetector::default();
        let a = detector.detect(&img, 1);
        let b = detector.detect(&img, 2);
        assert_eq!(a.keypoints.len(), b.keypoints.len());
    }
}
