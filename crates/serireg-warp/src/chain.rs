//! The full per-slide transform chain described in the warp algebra:
//! `xy_canonical = NR( R( S_in(xy_native) ) )`.

use crate::{affine::{Affine, ShapeRc}, displacement::DisplacementField};

/// Everything needed to move a point (or pixel) between one slide's own
/// native pixel grid and the set's shared canonical frame.
#[derive(Debug, Clone)]
pub struct SlideTransform {
    /// Shape of the slide's own pixel buffer being warped (`s_src`/`s_dst`
    /// for the scaling law).
    pub native_shape: ShapeRc,
    /// Shape at which `rigid_m` was estimated (`shape_proc`).
    pub proc_shape: ShapeRc,
    /// `rigid_M`: inverse transform aligning the processed thumbnail into
    /// the canonical frame.
    pub rigid_m: Affine,
    /// `reg_shape`, identical across every slide in a set.
    pub canonical_shape: ShapeRc,
    pub fwd_dxdy: Option<DisplacementField>,
    pub bk_dxdy: Option<DisplacementField>,
}

impl SlideTransform {
    pub fn identity(shape: ShapeRc) -> Self {
        Self { native_shape: shape, proc_shape: shape, rigid_m: Affine::IDENTITY, canonical_shape: shape, fwd_dxdy: None, bk_dxdy: None }
    }

    fn s_in(&self) -> Affine {
        Affine::scale(self.proc_shape.1 as f64 / self.native_shape.1 as f64, self.proc_shape.0 as f64 / self.native_shape.0 as f64)
    }

    /// Forward chain: native -> canonical.
    pub fn to_canonical(&self, xy_native: [f64; 2]) -> [f64; 2] {
        let proc_xy = self.s_in().apply(xy_native);
        let canon_xy = self.rigid_m.apply(proc_xy);
        match &self.fwd_dxdy {
            Some(field) => {
                let d = field.sample(canon_xy[0], canon_xy[1]);
                [canon_xy[0] + d[0] as f64, canon_xy[1] + d[1] as f64]
            }
            None => canon_xy,
        }
    }

    /// Inverse chain: canonical -> native. Fails only if `rigid_m` is
    /// singular, which should never happen for a valid slide record.
    pub fn from_canonical(&self, xy_canonical: [f64; 2]) -> anyhow::Result<[f64; 2]> {
        let adjusted = match &self.bk_dxdy {
            Some(field) => {
                let d = field.sample(xy_canonical[0], xy_canonical[1]);
                [xy_canonical[0] + d[0] as f64, xy_canonical[1] + d[1] as f64]
            }
            None => xy_canonical,
        };
        let rigid_inv = self.rigid_m.invert().ok_or_else(|| anyhow::anyhow!("rigid_M is not invertible"))?;
        let proc_xy = rigid_inv.apply(adjusted);
        let s_in_inv = Affine::scale(self.native_shape.1 as f64 / self.proc_shape.1 as f64, self.native_shape.0 as f64 / self.proc_shape.0 as f64);
        Ok(s_in_inv.apply(proc_xy))
    }

    /// Cross-slide point warp: moves `xy` from this slide's native
    /// coordinates into `to`'s native coordinates via the shared canonical
    /// frame, without materializing any intermediate image.
    pub fn warp_to(&self, to: &SlideTransform, xy_native: [f64; 2]) -> anyhow::Result<[f64; 2]> {
        anyhow::ensure!(self.canonical_shape == to.canonical_shape, "slides do not share a canonical frame");
        to.from_canonical(self.to_canonical(xy_native))
    }

    /// Rescale this transform so that it operates between different native
    /// and canonical-frame resolutions than it was fit at, per the warp
    /// algebra's scaling law. Used to move a rigid fit computed on a
    /// thumbnail up to a full-resolution pyramid level.
    pub fn rescaled(&self, new_native_shape: ShapeRc, new_canonical_shape: ShapeRc) -> SlideTransform {
        let rigid_m = self.rigid_m.rescaled(self.proc_shape, self.canonical_shape, self.proc_shape, new_canonical_shape);
        SlideTransform {
            native_shape: new_native_shape,
            proc_shape: self.proc_shape,
            rigid_m,
            canonical_shape: new_canonical_shape,
            fwd_dxdy: self.fwd_dxdy.as_ref().map(|f| f.scaled_to(new_canonical_shape)),
            bk_dxdy: self.bk_dxdy.as_ref().map(|f| f.scaled_to(new_canonical_shape)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_chain_passes_through() {
        let t = SlideTransform::identity((50, 50));
        let p = [10.0, 20.0];
        assert_eq!(t.to_canonical(p), p);
        assert_eq!(t.from_canonical(p).unwrap(), p);
    }

    #[test]
    fn cross_slide_round_trip_within_one_pixel() {
        let a = SlideTransform { rigid_m: Affine::similarity(1.05, 0.1, 3.0, -2.0), ..SlideTransform::identity((100, 100)) };
        let b = SlideTransform { rigid_m: Affine::similarity(0.9, -0.05, -1.0, 4.0), ..SlideTransform::identity((100, 100)) };
        let p = [30.0, 40.0];
        let in_b = a.warp_to(&b, p).unwrap();
        let back_in_a = b.warp_to(&a, in_b).unwrap();
        let d = ((back_in_a[0] - p[0]).powi(2) + (back_in_a[1] - p[1]).powi(2)).sqrt();
        assert!(d < 1.0, "cross-slide round trip drifted by {d}");
    }

    #[test]
    fn reference_slide_translation_only() {
        let reference = SlideTransform { rigid_m: Affine::translation(12.0, -4.0), ..SlideTransform::identity((64, 64)) };
        assert!(reference.rigid_m.is_pure_translation(1e-9));
    }
}
