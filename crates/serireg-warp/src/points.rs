//! Point- and polygon-level primitives of the warp algebra.

use crate::{affine::{Affine, ShapeRc}, displacement::DisplacementField};

/// `warp_points`: map `pts` (in the coordinate system `m` was fit to take
/// as input) through `m` and then, if supplied, offset by `fwd_dxdy`
/// sampled at the resulting location. `src_shape`/`dst_shape` are used to
/// rescale `m` when it was estimated at a different resolution than the
/// points are expressed in.
pub fn warp_points(pts: &[[f64; 2]], m: &Affine, src_shape: ShapeRc, dst_shape: ShapeRc, fwd_dxdy: Option<&DisplacementField>) -> Vec<[f64; 2]> {
    let m = if src_shape == dst_shape { *m } else { m.rescaled(src_shape, dst_shape, src_shape, dst_shape) };
    pts.iter()
        .map(|&p| {
            let warped = m.apply(p);
            match fwd_dxdy {
                Some(field) => {
                    let d = field.sample(warped[0], warped[1]);
                    [warped[0] + d[0] as f64, warped[1] + d[1] as f64]
                }
                None => warped,
            }
        })
        .collect()
}

/// A polygon as an ordered ring of points; the last point is implicitly
/// connected back to the first.
#[derive(Debug, Clone)]
pub struct Polygon(pub Vec<[f64; 2]>);

/// `warp_polygon`: subdivide long edges before warping so a straight edge
/// under an affine map stays straight, but a non-rigid field bends it
/// smoothly instead of keeping only its original vertices.
pub fn warp_polygon(geom: &Polygon, m: &Affine, src_shape: ShapeRc, dst_shape: ShapeRc, fwd_dxdy: Option<&DisplacementField>, max_edge_len: f64) -> Polygon {
    let subdivided = subdivide_ring(&geom.0, max_edge_len);
    Polygon(warp_points(&subdivided, m, src_shape, dst_shape, fwd_dxdy))
}

fn subdivide_ring(ring: &[[f64; 2]], max_edge_len: f64) -> Vec<[f64; 2]> {
    if ring.len() < 2 || max_edge_len <= 0.0 {
        return ring.to_vec();
    }
    let mut out = Vec::with_capacity(ring.len() * 2);
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        out.push(a);
        let dist = ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt();
        let steps = (dist / max_edge_len).floor() as usize;
        for step in 1..=steps {
            let t = step as f64 / (steps + 1) as f64;
            out.push([a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warp_points_identity_passthrough() {
        let pts = vec![[1.0, 2.0], [3.0, 4.0]];
        let out = warp_points(&pts, &Affine::IDENTITY, (10, 10), (10, 10), None);
        assert_eq!(out, pts);
    }

    #[test]
    fn subdivide_adds_points_on_long_edges() {
        let ring = vec![[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0]];
        let subdivided = subdivide_ring(&ring, 10.0);
        assert!(subdivided.len() > ring.len());
    }

    #[test]
    fn round_trip_within_one_pixel() {
        let m = Affine::similarity(1.1, 0.2, 5.0, -3.0);
        let inv = m.invert().unwrap();
        let pts = vec![[12.0, 40.0], [3.0, 9.0]];
        let forward = warp_points(&pts, &m, (100, 100), (120, 120), None);
        let back = warp_points(&forward, &inv, (120, 120), (100, 100), None);
        for (a, b) in pts.iter().zip(back.iter()) {
            let d = ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt();
            assert!(d < 1.0, "round trip drifted by {d}");
        }
    }
}
