//! The N×N pairwise similarity matrix feature detection builds before
//! stack ordering (§4.4).

use ndarray::Array2;

/// `S[i,j]` is the inlier count between slides `i` and `j`; symmetric,
/// zero diagonal.
pub fn build_similarity_matrix(n: usize, pair_inlier_counts: &[((usize, usize), usize)]) -> Array2<f64> {
    let mut s = Array2::<f64>::zeros((n, n));
    for &((i, j), count) in pair_inlier_counts {
        s[[i, j]] = count as f64;
        s[[j, i]] = count as f64;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_is_symmetric_with_zero_diagonal() {
        let s = build_similarity_matrix(3, &[((0, 1), 10), ((1, 2), 4)]);
        assert_eq!(s[[0, 1]], s[[1, 0]]);
        assert_eq!(s[[0, 0]], 0.0);
    }
}
