//! 3x3 homogeneous transforms used to move points between a slide's own
//! pixel grid and the shared canonical frame.

use serde::{Deserialize, Serialize};

/// A 2-D homogeneous transform, row-major, acting on column vectors
/// `[x, y, 1]^T`. Composition reads left-to-right: `a.then(b)` means "apply
/// `a` first, then `b`", matching how a moving slide's matrix is built from
/// its pairwise transform to a fixed slide.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine(pub [[f64; 3]; 3]);

/// Shape of an image as `(rows, cols)`, matching the data model's
/// convention throughout the crate.
pub type ShapeRc = (usize, usize);

impl Affine {
    pub const IDENTITY: Affine = Affine([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    pub fn translation(tx: f64, ty: f64) -> Self {
        Affine([[1.0, 0.0, tx], [0.0, 1.0, ty], [0.0, 0.0, 1.0]])
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Affine([[sx, 0.0, 0.0], [0.0, sy, 0.0], [0.0, 0.0, 1.0]])
    }

    /// A similarity transform: uniform scale, rotation (radians), then translation.
    pub fn similarity(scale: f64, rotation_rad: f64, tx: f64, ty: f64) -> Self {
        let (s, c) = rotation_rad.sin_cos();
        Affine([[scale * c, -scale * s, tx], [scale * s, scale * c, ty], [0.0, 0.0, 1.0]])
    }

    /// Flip a unit axis; used to test reflection variants during rigid fitting.
    pub fn reflection(flip_x: bool, flip_y: bool) -> Self {
        Affine::scale(if flip_x { -1.0 } else { 1.0 }, if flip_y { -1.0 } else { 1.0 })
    }

    pub fn row(&self, idx: usize) -> [f64; 3] {
        self.0[idx]
    }

    /// Matrix product `self * other`, i.e. `other` is applied first.
    pub fn mul(&self, other: &Affine) -> Affine {
        let mut out = [[0.0; 3]; 3];
        for r in 0..3 {
            for c in 0..3 {
                out[r][c] = (0..3).map(|k| self.0[r][k] * other.0[k][c]).sum();
            }
        }
        Affine(out)
    }

    /// Apply `self` then `next`: `next` is the outer transform.
    pub fn then(&self, next: &Affine) -> Affine {
        next.mul(self)
    }

    pub fn apply(&self, xy: [f64; 2]) -> [f64; 2] {
        let [x, y] = xy;
        let m = &self.0;
        let w = m[2][0] * x + m[2][1] * y + m[2][2];
        [(m[0][0] * x + m[0][1] * y + m[0][2]) / w, (m[1][0] * x + m[1][1] * y + m[1][2]) / w]
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.0;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1]) - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    pub fn invert(&self) -> Option<Affine> {
        let m = &self.0;
        let det = self.determinant();
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;
        let mut out = [[0.0; 3]; 3];
        let cofactor = |r0: usize, r1: usize, c0: usize, c1: usize| m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0];
        out[0][0] = cofactor(1, 2, 1, 2) * inv_det;
        out[0][1] = -cofactor(0, 2, 1, 2) * inv_det;
        out[0][2] = cofactor(0, 1, 1, 2) * inv_det;
        out[1][0] = -cofactor(1, 2, 0, 2) * inv_det;
        out[1][1] = cofactor(0, 2, 0, 2) * inv_det;
        out[1][2] = -cofactor(0, 1, 0, 2) * inv_det;
        out[2][0] = cofactor(1, 2, 0, 1) * inv_det;
        out[2][1] = -cofactor(0, 2, 0, 1) * inv_det;
        out[2][2] = cofactor(0, 1, 0, 1) * inv_det;
        Some(Affine(out))
    }

    /// True when the linear part is the identity, i.e. the transform is a
    /// pure translation within `eps`. The reference slide's canonical
    /// matrix must satisfy this.
    pub fn is_pure_translation(&self, eps: f64) -> bool {
        let m = &self.0;
        (m[0][0] - 1.0).abs() < eps && m[0][1].abs() < eps && (m[1][1] - 1.0).abs() < eps && m[1][0].abs() < eps
    }

    pub fn translation_of(&self) -> [f64; 2] {
        [self.0[0][2], self.0[1][2]]
    }

    /// Per-axis (x, y) scale factor implied by the linear part, used for
    /// reporting and for deciding whether a caller-supplied matrix matches
    /// the shape it claims to have been fit at.
    pub fn axis_scale(&self) -> [f64; 2] {
        let m = &self.0;
        [(m[0][0].powi(2) + m[1][0].powi(2)).sqrt(), (m[0][1].powi(2) + m[1][1].powi(2)).sqrt()]
    }

    /// Implements the scaling law of the warp algebra: given the shapes a
    /// matrix was fit at (`src_fit`, `dst_fit`) and the native shapes it is
    /// now being asked to move points between (`s_src`, `s_dst`), returns
    /// `T(s_dst/dst_fit) . M . T(src_fit/s_src)`.
    pub fn rescaled(&self, src_fit: ShapeRc, dst_fit: ShapeRc, s_src: ShapeRc, s_dst: ShapeRc) -> Affine {
        let axis_ratio = |num: ShapeRc, den: ShapeRc| (num.1 as f64 / den.1 as f64, num.0 as f64 / den.0 as f64);
        let (sx_out, sy_out) = axis_ratio(s_dst, dst_fit);
        let (sx_in, sy_in) = axis_ratio(src_fit, s_src);
        Affine::scale(sx_out, sy_out).mul(self).mul(&Affine::scale(sx_in, sy_in))
    }
}

impl Default for Affine {
    fn default() -> Self {
        Affine::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_roundtrips() {
        let p = [12.5, -3.0];
        assert_eq!(Affine::IDENTITY.apply(p), p);
    }

    #[test]
    fn invert_is_left_and_right_inverse() {
        let m = Affine::similarity(1.3, 0.4, 10.0, -6.0);
        let inv = m.invert().expect("invertible");
        let p = [5.0, 7.0];
        let back = inv.apply(m.apply(p));
        assert!((back[0] - p[0]).abs() < 1e-9);
        assert!((back[1] - p[1]).abs() < 1e-9);
    }

    #[test]
    fn composition_order() {
        let t1 = Affine::translation(1.0, 0.0);
        let t2 = Affine::translation(0.0, 1.0);
        let composed = t1.then(&t2);
        assert_eq!(composed.apply([0.0, 0.0]), [1.0, 1.0]);
    }

    #[test]
    fn pure_translation_detects_identity_linear_part() {
        assert!(Affine::translation(4.0, -2.0).is_pure_translation(1e-9));
        assert!(!Affine::similarity(1.01, 0.0, 0.0, 0.0).is_pure_translation(1e-9));
    }

    #[test]
    fn rescale_matches_scaling_law_for_pure_scale() {
        let m = Affine::scale(2.0, 2.0);
        let rescaled = m.rescaled((100, 100), (200, 200), (50, 50), (200, 200));
        // src halved relative to fit (50 vs 100) => extra x2 on input side;
        // dst unchanged relative to fit => no extra scale on output side.
        let p = [10.0, 10.0];
        let direct = rescaled.apply(p);
        assert!((direct[0] - 40.0).abs() < 1e-9);
        assert!((direct[1] - 40.0).abs() < 1e-9);
    }
}
