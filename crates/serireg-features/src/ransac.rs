//! RANSAC-based match filtering against a rigid model class (§4.4: "filter
//! them using a chosen policy, e.g. grid-motion-statistics or RANSAC with
//! the rigid model class").

use {
    crate::types::MatchPair,
    rand::{seq::SliceRandom, SeedableRng},
    rand_chacha::ChaCha8Rng,
    serireg_warp::{fit, Affine, TransformClass},
};

pub struct RansacConfig {
    pub class: TransformClass,
    pub iterations: usize,
    pub inlier_threshold_px: f64,
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self { class: TransformClass::Similarity, iterations: 500, inlier_threshold_px: 4.0, seed: 0 }
    }
}

fn min_sample_size(class: TransformClass) -> usize {
    match class {
        TransformClass::Similarity => 2,
        TransformClass::Affine => 3,
        TransformClass::Projective => 4,
    }
}

/// Fit `cfg.class` repeatedly to random minimal samples of `matches` and
/// keep the sample whose consensus set (inliers under
/// `inlier_threshold_px`) is largest. Returns the inlier subset and the
/// transform fit to that full consensus set, or `None` if there are not
/// enough matches to fit the model at all.
pub fn ransac_filter(matches: &[MatchPair], src_pts: &[[f64; 2]], dst_pts: &[[f64; 2]], cfg: &RansacConfig) -> Option<(Vec<MatchPair>, Affine)> {
    let sample_size = min_sample_size(cfg.class);
    if matches.len() < sample_size {
        return None;
    }
    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
    let mut best_inliers: Vec<usize> = Vec::new();

    let indices: Vec<usize> = (0..matches.len()).collect();
    for _ in 0..cfg.iterations {
        let sample: Vec<usize> = indices.choose_multiple(&mut rng, sample_size).copied().collect();
        let sample_src: Vec<[f64; 2]> = sample.iter().map(|&k| src_pts[k]).collect();
        let sample_dst: Vec<[f64; 2]> = sample.iter().map(|&k| dst_pts[k]).collect();
        let Some(candidate) = fit::fit(cfg.class, &sample_src, &sample_dst, false) else { continue };
        let inliers: Vec<usize> = (0..matches.len())
            .filter(|&k| {
                let predicted = candidate.apply(src_pts[k]);
                let d = ((predicted[0] - dst_pts[k][0]).powi(2) + (predicted[1] - dst_pts[k][1]).powi(2)).sqrt();
                d <= cfg.inlier_threshold_px
            })
            .collect();
        if inliers.len() > best_inliers.len() {
            best_inliers = inliers;
        }
    }
    if best_inliers.len() < sample_size {
        return None;
    }
    let consensus_src: Vec<[f64; 2]> = best_inliers.iter().map(|&k| src_pts[k]).collect();
    let consensus_dst: Vec<[f64; 2]> = best_inliers.iter().map(|&k| dst_pts[k]).collect();
    let refit = fit::fit(cfg.class, &consensus_src, &consensus_dst, false)?;
    let inlier_matches = best_inliers.iter().map(|&k| matches[k]).collect();
    Some((inlier_matches, refit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_inliers_under_outlier_contamination() {
        let truth = Affine::similarity(1.0, 0.0, 10.0, -5.0);
        let mut src_pts = Vec::new();
        let mut dst_pts = Vec::new();
        let mut matches = Vec::new();
        for i in 0..20 {
            let p = [i as f64 * 3.0, (i % 5) as f64 * 2.0];
            src_pts.push(p);
            dst_pts.push(truth.apply(p));
            matches.push(MatchPair { i, j: i, distance: 0.0 });
        }
        // contaminate with 5 outliers
        for i in 20..25 {
            src_pts.push([i as f64, i as f64]);
            dst_pts.push([1000.0, -1000.0]);
            matches.push(MatchPair { i, j: i, distance: 0.0 });
        }
        let cfg = RansacConfig { seed: 42, ..Default::default() };
        let (inliers, _fit) = ransac_filter(&matches, &src_pts, &dst_pts, &cfg).unwrap();
        assert!(inliers.len() >= 18, "expected most of the 20 true inliers, got {}", inliers.len());
    }

    #[test]
    fn too_few_matches_returns_none() {
        let cfg = RansacConfig::default();
        assert!(ransac_filter(&[], &[], &[], &cfg).is_none());
    }
}
