//! Reflection search during rigid fit (§4.5, §11.3): try all four axis
//! reflections of the source points and keep whichever fit has the most
//! inliers.

use serireg_warp::{fit, Affine, TransformClass};

const REFLECTIONS: [(bool, bool); 4] = [(false, false), (true, false), (false, true), (true, true)];

fn inlier_count(candidate: &Affine, src: &[[f64; 2]], dst: &[[f64; 2]], threshold_px: f64) -> usize {
    src.iter()
        .zip(dst)
        .filter(|(&s, &d)| {
            let p = candidate.apply(s);
            ((p[0] - d[0]).powi(2) + (p[1] - d[1]).powi(2)).sqrt() <= threshold_px
        })
        .count()
}

/// Fit `class` against every reflection of `src`, keeping the variant
/// with the most inliers under `threshold_px`. Returns the transform that
/// maps the *original* (unreflected) `src` to `dst`.
pub fn fit_with_reflection_search(src: &[[f64; 2]], dst: &[[f64; 2]], class: TransformClass, threshold_px: f64) -> Option<(Affine, usize)> {
    let mut best: Option<(Affine, usize)> = None;
    for &(flip_x, flip_y) in &REFLECTIONS {
        let reflection = Affine::reflection(flip_x, flip_y);
        let reflected_src: Vec<[f64; 2]> = src.iter().map(|&p| reflection.apply(p)).collect();
        let Some(fitted) = fit::fit(class, &reflected_src, dst, false) else { continue };
        let full = reflection.then(&fitted);
        let count = inlier_count(&full, src, dst, threshold_px);
        if best.as_ref().map(|(_, c)| count > *c).unwrap_or(true) {
            best = Some((full, count));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_known_flip() {
        let flip = Affine::reflection(true, false);
        let src = [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [10.0, 10.0]];
        let dst: Vec<[f64; 2]> = src.iter().map(|&p| flip.apply(p)).collect();
        let (fitted, count) = fit_with_reflection_search(&src, &dst, TransformClass::Affine, 1.0).unwrap();
        assert_eq!(count, 4);
        for p in src {
            let a = flip.apply(p);
            let b = fitted.apply(p);
            assert!(((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt() < 1e-6);
        }
    }
}
