//! Warp algebra: the affine and dense-displacement primitives every other
//! crate in the registration pipeline uses to move points and pixels
//! between a slide's own coordinate system and the set's shared canonical
//! frame.

pub mod affine;
pub mod bg_color;
pub mod chain;
pub mod crop;
pub mod displacement;
pub mod fit;
pub mod image_ops;
pub mod points;

pub use affine::{Affine, ShapeRc};
pub use bg_color::{estimate_background, Modality};
pub use chain::SlideTransform;
pub use crop::{fill_holes, hysteresis_threshold, none_crop_mask, overlap_crop_mask, reference_crop_mask, CropMode};
pub use displacement::{bbox_for_mask, corners_of, BboxXywh, DisplacementField};
pub use fit::{fit, fit_affine, fit_projective, fit_similarity, next_retry_class, TransformClass};
pub use image_ops::{warp_image_from_to, warp_image_to_canonical, warp_with_inverse_map, Interp};
pub use points::{warp_points, warp_polygon, Polygon};
