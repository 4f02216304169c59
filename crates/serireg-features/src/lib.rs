//! Feature graph (C4): detection, pairwise matching, RANSAC filtering,
//! the similarity matrix, and stack ordering.

pub mod detector;
pub mod error;
pub mod matching;
pub mod neighbor_refine;
pub mod ordering;
pub mod ransac;
pub mod similarity_matrix;
pub mod types;

use {
    crate::{error::InsufficientMatches, ransac::RansacConfig, types::FeatureSet},
    ndarray::Array2,
    serireg_warp::Affine,
};

pub use detector::{FeatureDetector, GridPatchDetector};
pub use ordering::{greedy_chain_order, stack_indices};
pub use types::MatchPair;

pub const MIN_INLIER_MATCHES: usize = 3;

/// The filtered match set and fitted transform between two slides, after
/// RANSAC but before neighbor refinement.
pub struct PairResult {
    pub inliers: Vec<MatchPair>,
    pub fit: Affine,
}

/// Detect features on every slide, RANSAC-filter every ordered pair, and
/// build the similarity matrix used for stack ordering.
pub fn build_pairwise_results(
    feature_sets: &[FeatureSet],
    class: serireg_warp::TransformClass,
    iterations: usize,
    inlier_threshold_px: f64,
    seed: u64,
) -> Vec<Vec<Option<PairResult>>> {
    let n = feature_sets.len();
    let mut results: Vec<Vec<Option<PairResult>>> = (0..n).map(|_| (0..n).map(|_| None).collect()).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            let raw_matches = matching::mutual_nearest_neighbors(&feature_sets[i], &feature_sets[j]);
            let src_pts: Vec<[f64; 2]> = raw_matches.iter().map(|m| [feature_sets[i].keypoints[m.i][0] as f64, feature_sets[i].keypoints[m.i][1] as f64]).collect();
            let dst_pts: Vec<[f64; 2]> = raw_matches.iter().map(|m| [feature_sets[j].keypoints[m.j][0] as f64, feature_sets[j].keypoints[m.j][1] as f64]).collect();
            let cfg = RansacConfig { class, iterations, inlier_threshold_px, seed: seed.wrapping_add((i * 1000 + j) as u64) };
            if let Some((inliers, fit)) = ransac::ransac_filter(&raw_matches, &src_pts, &dst_pts, &cfg) {
                results[i][j] = Some(PairResult { inliers, fit });
            }
        }
    }
    results
}

pub fn similarity_matrix_from_results(n: usize, results: &[Vec<Option<PairResult>>]) -> Array2<f64> {
    let counts: Vec<((usize, usize), usize)> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .filter_map(|(i, j)| results[i][j].as_ref().map(|r| ((i, j), r.inliers.len())))
        .collect();
    similarity_matrix::build_similarity_matrix(n, &counts)
}

/// §4.4's failure rule: every slide must have at least `MIN_INLIER_MATCHES`
/// inliers to every candidate neighbor it was paired against.
pub fn check_sufficient_matches(n: usize, results: &[Vec<Option<PairResult>>]) -> Result<(), InsufficientMatches> {
    for i in 0..n {
        let mut scores: Vec<(usize, usize)> = (0..n)
            .filter(|&j| j != i)
            .map(|j| {
                let count = if i < j { results[i][j].as_ref() } else { results[j][i].as_ref() }.map(|r| r.inliers.len()).unwrap_or(0);
                (j, count)
            })
            .collect();
        if scores.is_empty() {
            continue;
        }
        if scores.iter().all(|&(_, count)| count < MIN_INLIER_MATCHES) {
            scores.sort_by_key(|&(_, count)| count);
            return Err(InsufficientMatches { slide: i, min_required: MIN_INLIER_MATCHES, worst_pairs: scores.into_iter().take(2).collect() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2 as NdArray2;

    fn synthetic_feature_set(offset: f32) -> FeatureSet {
        let keypoints: Vec<[f32; 2]> = (0..10).map(|i| [i as f32 * 5.0 + offset, i as f32 * 3.0]).collect();
        let descriptors: Vec<Vec<f32>> = keypoints.iter().map(|p| vec![p[0], p[1]]).collect();
        FeatureSet { keypoints, descriptors }
    }

    #[test]
    fn well_matched_pair_passes_sufficiency_check() {
        let sets = vec![synthetic_feature_set(0.0), synthetic_feature_set(1.0)];
        let results = build_pairwise_results(&sets, serireg_warp::TransformClass::Similarity, 500, 4.0, 0);
        assert!(check_sufficient_matches(2, &results).is_ok());
    }

    #[test]
    fn isolated_slide_with_no_matches_is_insufficient() {
        let sets = vec![synthetic_feature_set(0.0), FeatureSet { keypoints: vec![], descriptors: vec![] }];
        let results = build_pairwise_results(&sets, serireg_warp::TransformClass::Similarity, 500, 4.0, 0);
        let err = check_sufficient_matches(2, &results).unwrap_err();
        assert_eq!(err.slide, 1);
    }

    #[test]
    fn similarity_matrix_has_expected_shape() {
        let sets = vec![synthetic_feature_set(0.0), synthetic_feature_set(1.0), synthetic_feature_set(2.0)];
        let results = build_pairwise_results(&sets, serireg_warp::TransformClass::Similarity, 500, 4.0, 0);
        let m: NdArray2<f64> = similarity_matrix_from_results(3, &results);
        assert_eq!(m.dim(), (3, 3));
    }
}
