//! Mutual nearest-neighbor descriptor matching (§4.4).

use crate::types::{FeatureSet, MatchPair};

fn l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt()
}

/// For every descriptor in `a`, find its nearest neighbor in `b` and vice
/// versa; keep only pairs that agree both ways.
pub fn mutual_nearest_neighbors(a: &FeatureSet, b: &FeatureSet) -> Vec<MatchPair> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let nn = |from: &FeatureSet, to: &FeatureSet| -> Vec<usize> {
        from.descriptors
            .iter()
            .map(|d| {
                to.descriptors
                    .iter()
                    .enumerate()
                    .min_by(|(_, x), (_, y)| l2(d, x).partial_cmp(&l2(d, y)).unwrap())
                    .map(|(idx, _)| idx)
                    .unwrap_or(0)
            })
            .collect()
    };
    let a_to_b = nn(a, b);
    let b_to_a = nn(b, a);
    a_to_b
        .iter()
        .enumerate()
        .filter_map(|(i, &j)| (b_to_a[j] == i).then(|| MatchPair { i, j, distance: l2(&a.descriptors[i], &b.descriptors[j]) }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_feature_sets_match_every_point() {
        let fs = FeatureSet { keypoints: vec![[0.0, 0.0], [1.0, 1.0]], descriptors: vec![vec![1.0, 2.0], vec![5.0, 6.0]] };
        let matches = mutual_nearest_neighbors(&fs.clone(), &fs);
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.distance < 1e-6));
    }

    #[test]
    fn disjoint_descriptors_still_match_by_proximity() {
        let a = FeatureSet { keypoints: vec![[0.0, 0.0]], descriptors: vec![vec![0.0, 0.0]] };
        let b = FeatureSet { keypoints: vec![[0.0, 0.0]], descriptors: vec![vec![100.0, 100.0]] };
        let matches = mutual_nearest_neighbors(&a, &b);
        assert_eq!(matches.len(), 1);
    }
}
