//! Least-squares transform fitting from point correspondences. Shared by
//! the feature graph's RANSAC inlier search (C4) and the rigid
//! registrar's pairwise fit (C5) so both draw on the same transform
//! classes defined in `affine.rs`.

use crate::affine::Affine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformClass {
    Similarity,
    Affine,
    Projective,
}

/// Solve a small dense linear system `a x = b` by Gaussian elimination
/// with partial pivoting. `a` is consumed (overwritten). Returns `None`
/// if the system is singular to working precision.
fn solve_linear(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot_row = (col..n).max_by(|&r1, &r2| a[r1][col].abs().partial_cmp(&a[r2][col].abs()).unwrap())?;
        if a[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);
        let pivot = a[col][col];
        for c in col..n {
            a[col][c] /= pivot;
        }
        b[col] /= pivot;
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for c in col..n {
                a[row][c] -= factor * a[col][c];
            }
            b[row] -= factor * b[col];
        }
    }
    Some(b)
}

/// Fit a general affine map (6 DOF) minimizing squared residuals via the
/// normal equations of the per-axis design matrix `[x, y, 1]`.
pub fn fit_affine(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Option<Affine> {
    if src.len() < 3 || src.len() != dst.len() {
        return None;
    }
    let mut ata = vec![vec![0.0f64; 3]; 3];
    let mut atb_x = vec![0.0f64; 3];
    let mut atb_y = vec![0.0f64; 3];
    for (s, d) in src.iter().zip(dst.iter()) {
        let row = [s[0], s[1], 1.0];
        for i in 0..3 {
            for j in 0..3 {
                ata[i][j] += row[i] * row[j];
            }
            atb_x[i] += row[i] * d[0];
            atb_y[i] += row[i] * d[1];
        }
    }
    let x_coeffs = solve_linear(ata.clone(), atb_x)?;
    let y_coeffs = solve_linear(ata, atb_y)?;
    Some(Affine([[x_coeffs[0], x_coeffs[1], x_coeffs[2]], [y_coeffs[0], y_coeffs[1], y_coeffs[2]], [0.0, 0.0, 1.0]]))
}

/// Fit a similarity transform (uniform scale + rotation + translation, 4
/// DOF) via the closed-form Umeyama solution. `allow_reflection` permits
/// the rotation matrix to include a reflection when that reduces error,
/// supporting §4.5's `check_reflections` search over axis flips.
pub fn fit_similarity(src: &[[f64; 2]], dst: &[[f64; 2]], allow_reflection: bool) -> Option<Affine> {
    if src.len() < 2 || src.len() != dst.len() {
        return None;
    }
    let n = src.len() as f64;
    let mean_src = src.iter().fold([0.0, 0.0], |acc, p| [acc[0] + p[0], acc[1] + p[1]]).map(|v| v / n);
    let mean_dst = dst.iter().fold([0.0, 0.0], |acc, p| [acc[0] + p[0], acc[1] + p[1]]).map(|v| v / n);

    let mut cov = [[0.0f64; 2]; 2];
    let mut var_src = 0.0f64;
    for (s, d) in src.iter().zip(dst.iter()) {
        let sx = s[0] - mean_src[0];
        let sy = s[1] - mean_src[1];
        let dx = d[0] - mean_dst[0];
        let dy = d[1] - mean_dst[1];
        cov[0][0] += dx * sx;
        cov[0][1] += dx * sy;
        cov[1][0] += dy * sx;
        cov[1][1] += dy * sy;
        var_src += sx * sx + sy * sy;
    }
    for row in cov.iter_mut() {
        for v in row.iter_mut() {
            *v /= n;
        }
    }
    var_src /= n;
    if var_src < 1e-12 {
        return None;
    }

    let (u, s_vals, vt) = svd_2x2(cov);
    let det_u = u[0][0] * u[1][1] - u[0][1] * u[1][0];
    let det_vt = vt[0][0] * vt[1][1] - vt[0][1] * vt[1][0];
    let mut d = [1.0, 1.0];
    if det_u * det_vt < 0.0 && !allow_reflection {
        d[1] = -1.0;
    }
    let r = mat2_mul(&mat2_mul(&u, &[[d[0], 0.0], [0.0, d[1]]]), &vt);
    let trace_sd: f64 = s_vals[0] * d[0] + s_vals[1] * d[1];
    let scale = trace_sd / var_src;

    let tx = mean_dst[0] - scale * (r[0][0] * mean_src[0] + r[0][1] * mean_src[1]);
    let ty = mean_dst[1] - scale * (r[1][0] * mean_src[0] + r[1][1] * mean_src[1]);
    Some(Affine([[scale * r[0][0], scale * r[0][1], tx], [scale * r[1][0], scale * r[1][1], ty], [0.0, 0.0, 1.0]]))
}

/// Fit a projective (homography, 8 DOF) map via the direct linear
/// transform, solved as an 8x8 linear least-squares system (normal
/// equations) with the scale fixed by `h33 = 1`.
pub fn fit_projective(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Option<Affine> {
    if src.len() < 4 || src.len() != dst.len() {
        return None;
    }
    let mut ata = vec![vec![0.0f64; 8]; 8];
    let mut atb = vec![0.0f64; 8];
    for (s, d) in src.iter().zip(dst.iter()) {
        let (x, y) = (s[0], s[1]);
        let (xp, yp) = (d[0], d[1]);
        let row_x: [f64; 8] = [x, y, 1.0, 0.0, 0.0, 0.0, -x * xp, -y * xp];
        let row_y: [f64; 8] = [0.0, 0.0, 0.0, x, y, 1.0, -x * yp, -y * yp];
        for (row, target) in [(row_x, xp), (row_y, yp)] {
            for i in 0..8 {
                for j in 0..8 {
                    ata[i][j] += row[i] * row[j];
                }
                atb[i] += row[i] * target;
            }
        }
    }
    let h = solve_linear(ata, atb)?;
    Some(Affine([[h[0], h[1], h[2]], [h[3], h[4], h[5]], [h[6], h[7], 1.0]]))
}

pub fn fit(class: TransformClass, src: &[[f64; 2]], dst: &[[f64; 2]], allow_reflection: bool) -> Option<Affine> {
    match class {
        TransformClass::Similarity => fit_similarity(src, dst, allow_reflection),
        TransformClass::Affine => fit_affine(src, dst),
        TransformClass::Projective => fit_projective(src, dst),
    }
}

/// Next class to retry with after `class` diverges, per §7's
/// similarity -> affine -> projective retry sequence. `None` once
/// projective has also failed.
pub fn next_retry_class(class: TransformClass) -> Option<TransformClass> {
    match class {
        TransformClass::Similarity => Some(TransformClass::Affine),
        TransformClass::Affine => Some(TransformClass::Projective),
        TransformClass::Projective => None,
    }
}

fn mat2_mul(a: &[[f64; 2]; 2], b: &[[f64; 2]; 2]) -> [[f64; 2]; 2] {
    [
        [a[0][0] * b[0][0] + a[0][1] * b[1][0], a[0][0] * b[0][1] + a[0][1] * b[1][1]],
        [a[1][0] * b[0][0] + a[1][1] * b[1][0], a[1][0] * b[0][1] + a[1][1] * b[1][1]],
    ]
}

/// Closed-form SVD of a 2x2 matrix, returning `(U, singular values, V^T)`.
fn svd_2x2(m: [[f64; 2]; 2]) -> ([[f64; 2]; 2], [f64; 2], [[f64; 2]; 2]) {
    let e = (m[0][0] + m[1][1]) / 2.0;
    let f = (m[0][0] - m[1][1]) / 2.0;
    let g = (m[1][0] + m[0][1]) / 2.0;
    let h = (m[1][0] - m[0][1]) / 2.0;
    let q = (e * e + h * h).sqrt();
    let r = (f * f + g * g).sqrt();
    let sx = q + r;
    let sy = (q - r).abs();
    let a1 = h.atan2(e);
    let a2 = g.atan2(f);
    let theta = (a2 - a1) / 2.0;
    let phi = (a2 + a1) / 2.0;
    let u = [[phi.cos(), -phi.sin()], [phi.sin(), phi.cos()]];
    let vt = [[theta.cos(), theta.sin()], [-theta.sin(), theta.cos()]];
    ((u), [sx, sy], (vt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affine_fit_recovers_known_transform() {
        let truth = Affine::similarity(1.2, 0.3, 5.0, -2.0);
        let src = [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [10.0, 10.0]];
        let dst: Vec<[f64; 2]> = src.iter().map(|&p| truth.apply(p)).collect();
        let fitted = fit_affine(&src, &dst).unwrap();
        for p in src {
            let a = truth.apply(p);
            let b = fitted.apply(p);
            assert!(((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt() < 1e-6);
        }
    }

    #[test]
    fn similarity_fit_recovers_known_transform() {
        let truth = Affine::similarity(0.8, -0.2, 3.0, 4.0);
        let src = [[0.0, 0.0], [20.0, 0.0], [0.0, 20.0]];
        let dst: Vec<[f64; 2]> = src.iter().map(|&p| truth.apply(p)).collect();
        let fitted = fit_similarity(&src, &dst, false).unwrap();
        for p in src {
            let a = truth.apply(p);
            let b = fitted.apply(p);
            assert!(((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt() < 1e-3);
        }
    }

    #[test]
    fn retry_sequence_ends_after_projective() {
        assert_eq!(next_retry_class(TransformClass::Similarity), Some(TransformClass::Affine));
        assert_eq!(next_retry_class(TransformClass::Affine), Some(TransformClass::Projective));
        assert_eq!(next_retry_class(TransformClass::Projective), None);
    }
}
