//! The pair of displacement fields every solver call returns (§4.6):
//! `bk_dxdy` (fixed -> moving) and `fwd_dxdy` (moving -> fixed), stored so
//! neither the point-warp nor the pixel-warp path has to invert at call
//! time.

use ndarray::Array3;
use serireg_warp::{BboxXywh, DisplacementField, ShapeRc};

pub struct PairedFields {
    pub bk: DisplacementField,
    pub fwd: DisplacementField,
}

impl PairedFields {
    pub fn zeros(shape: ShapeRc) -> Self {
        Self { bk: DisplacementField::zeros(shape), fwd: DisplacementField::zeros(shape) }
    }

    /// Both fields hold the same constant displacement; used by
    /// `ConstantShiftSolver` for tests only, since a real constant
    /// displacement is its own approximate inverse.
    pub fn constant(shape: ShapeRc, dx: f32, dy: f32) -> Self {
        let mut data = Array3::<f32>::zeros((2, shape.0, shape.1));
        data.slice_mut(ndarray::s![0, .., ..]).fill(dx);
        data.slice_mut(ndarray::s![1, .., ..]).fill(dy);
        let bbox = BboxXywh::full(shape);
        let fwd = DisplacementField::from_region(data.clone(), bbox, shape).expect("constant field shape matches bbox");
        let mut bk_data = data;
        bk_data.slice_mut(ndarray::s![0, .., ..]).fill(-dx);
        bk_data.slice_mut(ndarray::s![1, .., ..]).fill(-dy);
        let bk = DisplacementField::from_region(bk_data, bbox, shape).expect("constant field shape matches bbox");
        Self { bk, fwd }
    }
}
