//! Partial-rigid registration: the caller supplies some slides' matrices
//! up front (e.g. from a previous run, or ground truth), and the remaining
//! slides are fit relative to whichever already-known matrix sits closest
//! to them in the stack order. Per Open Question (a), a supplied entry
//! must declare both shapes it was fit at, or it is rejected outright.

use indexmap::IndexMap;
use serireg_warp::{Affine, ShapeRc};

use crate::{
    error::UnderspecifiedPartialRigid,
    full_rigid::{fit_full_rigid_chain, FullRigidConfig, PairCorrespondence, SlideFit},
};

/// A caller-supplied matrix for one slide, already fit at `src_shape` ->
/// `dst_shape`; rescaled onto the pipeline's working shapes before use.
pub struct KnownMatrix {
    pub slide: usize,
    pub matrix: Affine,
    pub src_shape: Option<ShapeRc>,
    pub dst_shape: Option<ShapeRc>,
}

fn validate(known: &[KnownMatrix]) -> Result<(), UnderspecifiedPartialRigid> {
    for k in known {
        if k.src_shape.is_none() {
            return Err(UnderspecifiedPartialRigid { slide: k.slide, missing: "src_shape" });
        }
        if k.dst_shape.is_none() {
            return Err(UnderspecifiedPartialRigid { slide: k.slide, missing: "dst_shape" });
        }
    }
    Ok(())
}

/// Rescale every supplied matrix from its fit shapes onto the working
/// shapes used by the rest of the chain, per the warp algebra's scaling
/// law (`Affine::rescaled`).
pub fn rescale_known(known: &[KnownMatrix], working_shapes: &IndexMap<usize, ShapeRc>) -> Result<IndexMap<usize, Affine>, UnderspecifiedPartialRigid> {
    validate(known)?;
    let mut out = IndexMap::new();
    for k in known {
        let src_fit = k.src_shape.expect("validated above");
        let dst_fit = k.dst_shape.expect("validated above");
        let s_src = working_shapes.get(&k.slide).copied().unwrap_or(src_fit);
        let s_dst = dst_fit;
        out.insert(k.slide, k.matrix.rescaled(src_fit, dst_fit, s_src, s_dst));
    }
    Ok(out)
}

/// Fill in any slide not covered by `known` using the ordinary full-rigid
/// chain walk, seeded with the known matrices instead of starting from the
/// reference slide alone.
pub fn fit_partial_rigid_chain(
    order: &[usize],
    known: IndexMap<usize, Affine>,
    correspondences: &IndexMap<(usize, usize), PairCorrespondence>,
    cfg: &FullRigidConfig,
) -> Result<IndexMap<usize, SlideFit>, crate::error::RigidFitDiverged> {
    if known.len() == order.len() {
        return Ok(known
            .into_iter()
            .map(|(slide, matrix)| (slide, SlideFit { matrix, class_used: cfg.start_class, inliers: usize::MAX }))
            .collect());
    }
    // seed the chain at whichever known slide sits first in stack order,
    // then let the full-rigid walk handle the rest; known matrices for
    // slides the walk would otherwise compute are kept as-is afterward.
    let seed_pos = order.iter().position(|s| known.contains_key(s)).unwrap_or(0);
    let mut fits = fit_full_rigid_chain(order, seed_pos, correspondences, cfg)?;
    for (slide, matrix) in known {
        fits.insert(slide, SlideFit { matrix, class_used: cfg.start_class, inliers: usize::MAX });
    }
    Ok(fits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dst_shape_is_rejected() {
        let known = vec![KnownMatrix { slide: 0, matrix: Affine::IDENTITY, src_shape: Some((100, 100)), dst_shape: None }];
        let err = validate(&known).unwrap_err();
        assert_eq!(err.slide, 0);
        assert_eq!(err.missing, "dst_shape");
    }

    #[test]
    fn rescale_applies_scaling_law() {
        let known = vec![KnownMatrix { slide: 0, matrix: Affine::scale(2.0, 2.0), src_shape: Some((100, 100)), dst_shape: Some((100, 100)) }];
        let mut shapes = IndexMap::new();
        shapes.insert(0, (50, 50));
        let rescaled = rescale_known(&known, &shapes).unwrap();
        let p = rescaled[&0].apply([10.0, 10.0]);
        assert!((p[0] - 40.0).abs() < 1e-9);
    }
}
