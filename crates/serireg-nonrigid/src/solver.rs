//! The dense non-rigid solver is an external collaborator (§6): "Non-rigid
//! solver (consumed): `solve(fixed_u8, moving_u8, mask_u8?) -> (bk_dxdy,
//! fwd_dxdy)`. May be called on sub-regions; must not mutate inputs."

use ndarray::Array2;

use crate::field::PairedFields;

pub trait NonRigidSolver {
    fn name(&self) -> &str;

    /// `fixed`/`moving` are 8-bit single-channel images of equal shape;
    /// `mask`, when present, restricts where the solver should trust the
    /// match (outside it the field is conventionally left at zero).
    fn solve(&self, fixed: &Array2<u8>, moving: &Array2<u8>, mask: Option<&Array2<u8>>) -> anyhow::Result<PairedFields>;
}

/// A solver whose output is always zero displacement, useful for testing
/// additivity (§8's "micro-refinement additivity with a zero-update
/// solver" scenario) without depending on a real registration algorithm.
pub struct IdentitySolver;

impl NonRigidSolver for IdentitySolver {
    fn name(&self) -> &str {
        "identity"
    }

    fn solve(&self, fixed: &Array2<u8>, _moving: &Array2<u8>, _mask: Option<&Array2<u8>>) -> anyhow::Result<PairedFields> {
        let shape = fixed.dim();
        Ok(PairedFields::zeros(shape))
    }
}

/// A solver that nudges every pixel by a fixed translation, useful for
/// exercising the solver-contract invariant (`bk` inverts `fwd`) without a
/// real optical-flow-style algorithm.
pub struct ConstantShiftSolver {
    pub dx: f32,
    pub dy: f32,
}

impl NonRigidSolver for ConstantShiftSolver {
    fn name(&self) -> &str {
        "constant-shift"
    }

    fn solve(&self, fixed: &Array2<u8>, _moving: &Array2<u8>, _mask: Option<&Array2<u8>>) -> anyhow::Result<PairedFields> {
        let shape = fixed.dim();
        Ok(PairedFields::constant(shape, self.dx, self.dy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_solver_produces_zero_fields() {
        let img = Array2::<u8>::zeros((8, 8));
        let fields = IdentitySolver.solve(&img, &img, None).unwrap();
        assert!(fields.fwd.is_zero_everywhere());
        assert!(fields.bk.is_zero_everywhere());
    }
}
