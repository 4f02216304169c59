//! C4 failure taxonomy: too few inlier matches is fatal for the whole set.

#[derive(Debug, thiserror::Error)]
#[error("slide {slide} has fewer than {min_required} inlier matches to every candidate neighbor (two worst pair scores: {worst_pairs:?})")]
pub struct InsufficientMatches {
    pub slide: usize,
    pub min_required: usize,
    /// Up to two `(other_slide, inlier_count)` pairs with the lowest scores.
    pub worst_pairs: Vec<(usize, usize)>,
}
