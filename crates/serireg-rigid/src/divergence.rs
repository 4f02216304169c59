//! Retry sequence for a single pairwise rigid fit: similarity, then affine,
//! then projective, each optionally searched over the four axis
//! reflections (§4.5, §7). A slide that diverges at every class is fatal.

use serireg_warp::{fit, Affine, TransformClass};

use crate::{error::RigidFitDiverged, reflections::fit_with_reflection_search};

#[derive(Debug)]
pub struct DivergenceOutcome {
    pub fit: Affine,
    pub class_used: TransformClass,
    pub inliers: usize,
    pub tried: Vec<TransformClass>,
}

/// Walk the similarity -> affine -> projective retry chain for one slide
/// pair, optionally searching reflections at each class. Returns the first
/// class whose consensus has at least `min_inliers` inliers.
pub fn fit_with_retries(
    slide: usize,
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    start_class: TransformClass,
    threshold_px: f64,
    min_inliers: usize,
    check_reflections: bool,
) -> Result<DivergenceOutcome, RigidFitDiverged> {
    let mut class = Some(start_class);
    let mut tried = Vec::new();
    while let Some(current) = class {
        tried.push(current);
        let outcome = if check_reflections {
            fit_with_reflection_search(src, dst, current, threshold_px)
        } else {
            fit::fit(current, src, dst, false).map(|fitted| {
                let count = src
                    .iter()
                    .zip(dst)
                    .filter(|(&s, &d)| {
                        let p = fitted.apply(s);
                        ((p[0] - d[0]).powi(2) + (p[1] - d[1]).powi(2)).sqrt() <= threshold_px
                    })
                    .count();
                (fitted, count)
            })
        };
        if let Some((fitted, count)) = outcome {
            if count >= min_inliers {
                return Ok(DivergenceOutcome { fit: fitted, class_used: current, inliers: count, tried });
            }
        }
        class = fit::next_retry_class(current);
    }
    Err(RigidFitDiverged { slide, tried })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn succeeds_at_first_class_when_well_conditioned() {
        let truth = Affine::similarity(1.0, 0.1, 4.0, -2.0);
        let src: Vec<[f64; 2]> = (0..10).map(|i| [i as f64 * 4.0, (i % 3) as f64 * 5.0]).collect();
        let dst: Vec<[f64; 2]> = src.iter().map(|&p| truth.apply(p)).collect();
        let outcome = fit_with_retries(0, &src, &dst, TransformClass::Similarity, 1.0, 5, false).unwrap();
        assert_eq!(outcome.class_used, TransformClass::Similarity);
        assert_eq!(outcome.tried, vec![TransformClass::Similarity]);
    }

    #[test]
    fn diverges_when_matches_are_too_few_at_every_class() {
        let src = [[0.0, 0.0], [1.0, 0.0]];
        let dst = [[0.0, 0.0], [1.0, 0.0]];
        let err = fit_with_retries(3, &src, &dst, TransformClass::Similarity, 1.0, 10, false).unwrap_err();
        assert_eq!(err.slide, 3);
        assert_eq!(err.tried, vec![TransformClass::Similarity, TransformClass::Affine, TransformClass::Projective]);
    }
}
