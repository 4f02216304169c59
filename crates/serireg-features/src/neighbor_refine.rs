//! Neighbor-refined matches (§4.4): after ordering, each non-boundary
//! slide's match set with its neighbor is re-filtered geometrically using
//! the initial rigid fit, discarding outliers consistent with a different
//! permutation.

use {crate::types::MatchPair, serireg_warp::Affine};

pub fn refine_with_fit(matches: &[MatchPair], src_pts: &[[f64; 2]], dst_pts: &[[f64; 2]], initial_fit: &Affine, threshold_px: f64) -> Vec<MatchPair> {
    matches
        .iter()
        .copied()
        .filter(|m| {
            let predicted = initial_fit.apply(src_pts[m.i]);
            let d = ((predicted[0] - dst_pts[m.j][0]).powi(2) + (predicted[1] - dst_pts[m.j][1]).powi(2)).sqrt();
            d <= threshold_px
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_matches_inconsistent_with_the_fit() {
        let identity = Affine::IDENTITY;
        let src_pts = vec![[0.0, 0.0], [10.0, 10.0]];
        let dst_pts = vec![[0.0, 0.0], [500.0, 500.0]];
        let matches = vec![MatchPair { i: 0, j: 0, distance: 0.0 }, MatchPair { i: 1, j: 1, distance: 0.0 }];
        let refined = refine_with_fit(&matches, &src_pts, &dst_pts, &identity, 2.0);
        assert_eq!(refined.len(), 1);
        assert_eq!(refined[0].i, 0);
    }
}
