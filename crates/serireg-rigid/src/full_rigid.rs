//! Full-rigid registration (§4.5): walk the ordered stack outward from the
//! reference slide, fitting each slide's matrix against its already-placed
//! neighbor in the chain and composing forward so every matrix ultimately
//! maps into the reference slide's processed frame.

use indexmap::IndexMap;
use serireg_warp::{Affine, TransformClass};

use crate::{
    divergence::{fit_with_retries, DivergenceOutcome},
    error::RigidFitDiverged,
};

/// Point correspondences between an ordered pair of slides, keyed
/// `(moving, fixed)`: `src_pts` lie in `moving`'s processed frame, `dst_pts`
/// in `fixed`'s.
pub struct PairCorrespondence {
    pub moving: usize,
    pub fixed: usize,
    pub src_pts: Vec<[f64; 2]>,
    pub dst_pts: Vec<[f64; 2]>,
}

pub struct FullRigidConfig {
    pub start_class: TransformClass,
    pub inlier_threshold_px: f64,
    pub min_inliers: usize,
    pub check_reflections: bool,
}

impl Default for FullRigidConfig {
    fn default() -> Self {
        Self { start_class: TransformClass::Similarity, inlier_threshold_px: 4.0, min_inliers: 3, check_reflections: false }
    }
}

pub struct SlideFit {
    pub matrix: Affine,
    pub class_used: TransformClass,
    pub inliers: usize,
}

/// Fit every slide's matrix into the reference slide's processed frame.
/// `order` is the stack order from `greedy_chain_order` (§4.4), `reference_idx`
/// is this slide's position within `order`. `correspondences` must contain an
/// entry for every adjacent pair in `order`, in either `(moving, fixed)`
/// direction.
pub fn fit_full_rigid_chain(
    order: &[usize],
    reference_idx: usize,
    correspondences: &IndexMap<(usize, usize), PairCorrespondence>,
    cfg: &FullRigidConfig,
) -> Result<IndexMap<usize, SlideFit>, RigidFitDiverged> {
    let mut matrices: IndexMap<usize, SlideFit> = IndexMap::new();
    matrices.insert(order[reference_idx], SlideFit { matrix: Affine::IDENTITY, class_used: cfg.start_class, inliers: usize::MAX });

    // walk outward from the reference position in both directions, each
    // step composing the new slide's pairwise fit onto its already-placed
    // neighbor's matrix into the reference frame.
    for step in 1..order.len() {
        if reference_idx + step < order.len() {
            extend_chain(order, reference_idx + step, reference_idx + step - 1, correspondences, cfg, &mut matrices)?;
        }
        if reference_idx >= step {
            extend_chain(order, reference_idx - step, reference_idx - step + 1, correspondences, cfg, &mut matrices)?;
        }
    }
    Ok(matrices)
}

fn extend_chain(
    order: &[usize],
    new_pos: usize,
    placed_pos: usize,
    correspondences: &IndexMap<(usize, usize), PairCorrespondence>,
    cfg: &FullRigidConfig,
    matrices: &mut IndexMap<usize, SlideFit>,
) -> Result<(), RigidFitDiverged> {
    let moving = order[new_pos];
    let placed = order[placed_pos];
    let pair = correspondences
        .get(&(moving, placed))
        .map(|c| (c.src_pts.clone(), c.dst_pts.clone()))
        .or_else(|| correspondences.get(&(placed, moving)).map(|c| (c.dst_pts.clone(), c.src_pts.clone())))
        .unwrap_or_default();
    let DivergenceOutcome { fit: m_pair, class_used, inliers, .. } =
        fit_with_retries(moving, &pair.0, &pair.1, cfg.start_class, cfg.inlier_threshold_px, cfg.min_inliers, cfg.check_reflections)?;
    let m_fixed = matrices[&placed].matrix;
    let m_moving = m_pair.then(&m_fixed);
    matrices.insert(moving, SlideFit { matrix: m_moving, class_used, inliers });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_points(n: usize) -> Vec<[f64; 2]> {
        (0..n).map(|i| [i as f64 * 4.0, (i % 4) as f64 * 6.0]).collect()
    }

    #[test]
    fn three_slide_chain_composes_into_reference_frame() {
        // slide 1 is the reference; slide 0 and slide 2 each sit one
        // similarity transform away from it.
        let t01 = Affine::similarity(1.0, 0.05, 3.0, -1.0); // maps slide 0 -> slide 1
        let t21 = Affine::similarity(1.0, -0.03, -2.0, 4.0); // maps slide 2 -> slide 1

        let pts0 = grid_points(10);
        let pts1_from_0: Vec<[f64; 2]> = pts0.iter().map(|&p| t01.apply(p)).collect();
        let pts2 = grid_points(10);
        let pts1_from_2: Vec<[f64; 2]> = pts2.iter().map(|&p| t21.apply(p)).collect();

        let mut correspondences = IndexMap::new();
        correspondences.insert((0, 1), PairCorrespondence { moving: 0, fixed: 1, src_pts: pts0.clone(), dst_pts: pts1_from_0 });
        correspondences.insert((2, 1), PairCorrespondence { moving: 2, fixed: 1, src_pts: pts2.clone(), dst_pts: pts1_from_2 });

        let order = vec![0, 1, 2];
        let cfg = FullRigidConfig::default();
        let fits = fit_full_rigid_chain(&order, 1, &correspondences, &cfg).unwrap();

        assert!(fits[&1].matrix.is_pure_translation(1e-6));
        let recovered0 = fits[&0].matrix.apply(pts0[0]);
        let expected0 = t01.apply(pts0[0]);
        assert!(((recovered0[0] - expected0[0]).powi(2) + (recovered0[1] - expected0[1]).powi(2)).sqrt() < 1e-3);
    }
}
