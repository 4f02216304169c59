//! Canonical-frame placement (§4.5/§4.1): once every slide has a matrix
//! into the reference slide's processed frame, translate the whole set so
//! the tight bounding box of every transformed slide's corners starts at
//! the origin. `reg_shape` is that bounding box; the reference slide's
//! final matrix is a pure translation, matching the warp algebra's
//! invariant (`Affine::is_pure_translation`).

use indexmap::IndexMap;
use serireg_warp::{corners_of, Affine, ShapeRc};

use crate::full_rigid::SlideFit;

pub struct CanonicalPlacement {
    pub reg_shape: ShapeRc,
    pub matrices: IndexMap<usize, Affine>,
}

/// `native_shapes` gives each slide's native `(rows, cols)` at the
/// resolution its `SlideFit::matrix` was computed at.
pub fn place_in_canonical_frame(fits: &IndexMap<usize, SlideFit>, native_shapes: &IndexMap<usize, ShapeRc>) -> CanonicalPlacement {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for (slide, fit) in fits {
        let shape = native_shapes[slide];
        for corner in corners_of(shape) {
            let p = fit.matrix.apply(corner);
            min_x = min_x.min(p[0]);
            min_y = min_y.min(p[1]);
            max_x = max_x.max(p[0]);
            max_y = max_y.max(p[1]);
        }
    }

    let offset = Affine::translation(-min_x, -min_y);
    let reg_shape: ShapeRc = ((max_y - min_y).ceil() as usize, (max_x - min_x).ceil() as usize);

    let matrices = fits.iter().map(|(&slide, fit)| (slide, fit.matrix.then(&offset))).collect();
    CanonicalPlacement { reg_shape, matrices }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_matrix_becomes_pure_translation() {
        let mut fits = IndexMap::new();
        fits.insert(0, SlideFit { matrix: Affine::similarity(1.0, 0.2, 5.0, -3.0), class_used: serireg_warp::TransformClass::Similarity, inliers: 10 });
        fits.insert(1, SlideFit { matrix: Affine::IDENTITY, class_used: serireg_warp::TransformClass::Similarity, inliers: usize::MAX });
        let mut shapes = IndexMap::new();
        shapes.insert(0, (100, 100));
        shapes.insert(1, (100, 100));

        let placement = place_in_canonical_frame(&fits, &shapes);
        assert!(placement.matrices[&1].is_pure_translation(1e-9));
        assert!(placement.reg_shape.0 > 0 && placement.reg_shape.1 > 0);
    }

    #[test]
    fn canonical_frame_has_no_negative_coverage() {
        let mut fits = IndexMap::new();
        fits.insert(0, SlideFit { matrix: Affine::translation(-50.0, -20.0), class_used: serireg_warp::TransformClass::Similarity, inliers: 10 });
        let mut shapes = IndexMap::new();
        shapes.insert(0, (100, 100));

        let placement = place_in_canonical_frame(&fits, &shapes);
        for corner in corners_of((100, 100)) {
            let p = placement.matrices[&0].apply(corner);
            assert!(p[0] >= -1e-9 && p[1] >= -1e-9);
        }
    }
}
