//! C5 failure taxonomy: a fit that diverges at every transform class in
//! the retry sequence is fatal (§7).

use serireg_warp::TransformClass;

#[derive(Debug, thiserror::Error)]
#[error("rigid fit diverged for slide {slide} after trying {tried:?}")]
pub struct RigidFitDiverged {
    pub slide: usize,
    pub tried: Vec<TransformClass>,
}

/// A caller-supplied partial-rigid entry missing a shape, per Open
/// Question (a): reject rather than silently assume a shape.
#[derive(Debug, thiserror::Error)]
#[error("partial-rigid entry for slide {slide} is missing {missing}")]
pub struct UnderspecifiedPartialRigid {
    pub slide: usize,
    pub missing: &'static str,
}
