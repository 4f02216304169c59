//! Non-rigid composition strategies (§4.6): serial-compose walks the
//! ordered stack accumulating displacement pairwise; align-to-reference
//! solves every slide directly against the reference with no chain. Both
//! must be supported; the caller picks one per run.
//!
//! A solver failure on any one pair is non-fatal (§7): the pair falls back
//! to an identity field and is recorded as a warning so the pipeline can
//! continue past it.

use indexmap::IndexMap;
use ndarray::Array2;
use serireg_warp::ShapeRc;

use crate::{error::SolverFailed, field::PairedFields, solver::NonRigidSolver};

pub struct NonRigidOutcome {
    pub fields: IndexMap<usize, PairedFields>,
    pub warnings: Vec<SolverFailed>,
}

/// `order` is the stack order from C4 (`greedy_chain_order`), `reference_pos`
/// its position within `order`. `images`/`masks` are rigidly-warped,
/// normalized, single-channel inputs at `reg_shape`, indexed by slide id.
/// When `compose` is true, the moving image is warped by the chain's
/// already-accumulated displacement before each solve, and the new field is
/// added to the accumulator (standard serial composition). When `compose`
/// is false, each pair solves directly against its un-warped neighbor; the
/// result is still folded into the running total so every slide's stored
/// field maps back to the reference, but the solver never sees a
/// pre-warped moving image.
pub fn serial_compose(
    order: &[usize],
    reference_pos: usize,
    images: &IndexMap<usize, Array2<u8>>,
    mask: &Array2<u8>,
    solver: &dyn NonRigidSolver,
    shape: ShapeRc,
    compose: bool,
) -> NonRigidOutcome {
    let mut fields = IndexMap::new();
    let mut warnings = Vec::new();
    fields.insert(order[reference_pos], PairedFields::zeros(shape));

    let mut accumulated = serireg_warp::DisplacementField::zeros(shape);
    for step in [1isize, -1isize] {
        let mut acc = accumulated.clone();
        let mut prev_pos = reference_pos as isize;
        loop {
            let pos = prev_pos + step;
            if pos < 0 || pos as usize >= order.len() {
                break;
            }
            let moving = order[pos as usize];
            let fixed = order[prev_pos as usize];
            let moving_input = if compose { warp_with_field(&images[&moving], &acc) } else { images[&moving].clone() };
            match solver.solve(&images[&fixed], &moving_input, Some(mask)) {
                Ok(pair) => {
                    acc = acc.compose(&pair.fwd);
                    fields.insert(moving, PairedFields { fwd: acc.clone(), bk: pair.bk });
                }
                Err(source) => {
                    warnings.push(SolverFailed { pair: (moving, fixed), source });
                    fields.insert(moving, PairedFields::zeros(shape));
                }
            }
            prev_pos = pos;
        }
        if step == 1 {
            accumulated = serireg_warp::DisplacementField::zeros(shape);
        }
    }
    NonRigidOutcome { fields, warnings }
}

pub fn align_to_reference(
    order: &[usize],
    reference_pos: usize,
    images: &IndexMap<usize, Array2<u8>>,
    mask: &Array2<u8>,
    solver: &dyn NonRigidSolver,
    shape: ShapeRc,
) -> NonRigidOutcome {
    let reference = order[reference_pos];
    let mut fields = IndexMap::new();
    let mut warnings = Vec::new();
    fields.insert(reference, PairedFields::zeros(shape));

    for (pos, &moving) in order.iter().enumerate() {
        if pos == reference_pos {
            continue;
        }
        match solver.solve(&images[&reference], &images[&moving], Some(mask)) {
            Ok(pair) => {
                fields.insert(moving, pair);
            }
            Err(source) => {
                warnings.push(SolverFailed { pair: (moving, reference), source });
                fields.insert(moving, PairedFields::zeros(shape));
            }
        }
    }
    NonRigidOutcome { fields, warnings }
}

/// Warp an 8-bit image forward by a displacement field's sample at each
/// output pixel, used to feed the already-accumulated displacement into
/// the next pairwise solve when `compose=true`.
fn warp_with_field(img: &Array2<u8>, field: &serireg_warp::DisplacementField) -> Array2<u8> {
    let (rows, cols) = img.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let d = field.sample(c as f64, r as f64);
        let (sx, sy) = (c as f64 + d[0] as f64, r as f64 + d[1] as f64);
        if sx < 0.0 || sy < 0.0 || sx >= cols as f64 - 1.0 || sy >= rows as f64 - 1.0 {
            return 0;
        }
        img[[sy as usize, sx as usize]]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::IdentitySolver;

    #[test]
    fn align_to_reference_leaves_reference_at_zero_field() {
        let shape = (8, 8);
        let mut images = IndexMap::new();
        images.insert(0, Array2::<u8>::zeros(shape));
        images.insert(1, Array2::<u8>::ones(shape));
        let mask = Array2::<u8>::from_elem(shape, 255);
        let order = vec![0, 1];
        let outcome = align_to_reference(&order, 0, &images, &mask, &IdentitySolver, shape);
        assert!(outcome.fields[&0].fwd.is_zero_everywhere());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn serial_compose_visits_every_non_reference_slide() {
        let shape = (8, 8);
        let mut images = IndexMap::new();
        for i in 0..3 {
            images.insert(i, Array2::<u8>::zeros(shape));
        }
        let mask = Array2::<u8>::from_elem(shape, 255);
        let order = vec![0, 1, 2];
        let outcome = serial_compose(&order, 1, &images, &mask, &IdentitySolver, shape, true);
        assert_eq!(outcome.fields.len(), 3);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn serial_compose_without_compose_still_folds_into_the_running_total() {
        let shape = (8, 8);
        let mut images = IndexMap::new();
        for i in 0..3 {
            images.insert(i, Array2::<u8>::zeros(shape));
        }
        let mask = Array2::<u8>::from_elem(shape, 255);
        let order = vec![0, 1, 2];
        let outcome = serial_compose(&order, 1, &images, &mask, &IdentitySolver, shape, false);
        assert_eq!(outcome.fields.len(), 3);
        assert!(outcome.warnings.is_empty());
    }
}
