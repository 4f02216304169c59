//! Micro-registrar (C7, §4.7): an optional higher-resolution refinement
//! pass whose field adds onto the existing one after both are resampled to
//! a common shape. Past a memory threshold the engine switches to tiling
//! the common frame and stitching tile-local fields with a Hann-window
//! weighted sum (Open Question (b)).

use ndarray::Array2;
use serireg_warp::{BboxXywh, DisplacementField, ShapeRc};

use crate::error::OutOfMemory;

const BYTES_PER_DISPLACEMENT_SAMPLE: u64 = 2 * 4; // two f32 bands

pub fn estimate_memory_bytes(shape: ShapeRc, in_flight_regions: usize) -> u64 {
    (shape.0 as u64) * (shape.1 as u64) * BYTES_PER_DISPLACEMENT_SAMPLE * in_flight_regions.max(1) as u64
}

/// §7: "promotes the remainder of the run to tiled mode; non-fatal" — the
/// caller checks this before each slide's micro pass and switches
/// strategy rather than treating it as fatal.
pub fn check_memory_budget(shape: ShapeRc, in_flight_regions: usize, threshold_bytes: u64) -> Result<(), OutOfMemory> {
    let estimated = estimate_memory_bytes(shape, in_flight_regions);
    if estimated > threshold_bytes {
        return Err(OutOfMemory { estimated_bytes: estimated, threshold_bytes });
    }
    Ok(())
}

/// Resample `existing` and `update` to `reg_shape` and add them, per
/// §4.7's non-tiled micro-registration update.
pub fn apply_micro_update(existing: &DisplacementField, update: &DisplacementField, reg_shape: ShapeRc) -> anyhow::Result<DisplacementField> {
    let existing_resampled = existing.scaled_to(reg_shape);
    let update_resampled = update.scaled_to(reg_shape);
    existing_resampled.add(&update_resampled)
}

/// Partition `shape` into overlapping tiles of (roughly) `tile_size` with
/// `overlap` pixels of margin shared between neighbors. The last tile in
/// each row/column is clipped to the frame boundary rather than padded.
pub fn tile_grid(shape: ShapeRc, tile_size: usize, overlap: usize) -> Vec<BboxXywh> {
    let (rows, cols) = shape;
    let stride = tile_size.saturating_sub(overlap).max(1);
    let mut tiles = Vec::new();
    let mut y = 0usize;
    while y < rows {
        let h = (y + tile_size).min(rows) - y;
        let mut x = 0usize;
        while x < cols {
            let w = (x + tile_size).min(cols) - x;
            tiles.push(BboxXywh { x: x as u32, y: y as u32, w: w as u32, h: h as u32 });
            if x + tile_size >= cols {
                break;
            }
            x += stride;
        }
        if y + tile_size >= rows {
            break;
        }
        y += stride;
    }
    tiles
}

fn hann_1d(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n).map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64).cos()).collect()
}

/// Per-pixel weight for one tile: the outer product of 1-D Hann windows
/// along each axis, tapering the tile's contribution to zero at its own
/// edges so overlapping neighbors blend smoothly.
fn hann_weights(tile_h: usize, tile_w: usize) -> Array2<f64> {
    let wy = hann_1d(tile_h);
    let wx = hann_1d(tile_w);
    Array2::from_shape_fn((tile_h, tile_w), |(r, c)| wy[r] * wx[c])
}

/// Stitch tile-local displacement fields (each already solved and
/// zero-padded to its own bbox) into one field over `full_shape`, weighting
/// overlap regions by the Hann window so adjacent tiles blend rather than
/// seam.
pub fn stitch_tiles(tiles: &[(BboxXywh, DisplacementField)], full_shape: ShapeRc) -> DisplacementField {
    let (rows, cols) = full_shape;
    let mut weighted_sum = ndarray::Array3::<f64>::zeros((2, rows, cols));
    let mut weight_total = Array2::<f64>::zeros((rows, cols));

    for (bbox, field) in tiles {
        let weights = hann_weights(bbox.h as usize, bbox.w as usize);
        for r in 0..bbox.h as usize {
            for c in 0..bbox.w as usize {
                let gx = bbox.x as usize + c;
                let gy = bbox.y as usize + r;
                let w = weights[[r, c]];
                let sample = field.sample(c as f64, r as f64);
                weighted_sum[[0, gy, gx]] += sample[0] as f64 * w;
                weighted_sum[[1, gy, gx]] += sample[1] as f64 * w;
                weight_total[[gy, gx]] += w;
            }
        }
    }

    let mut out = ndarray::Array3::<f32>::zeros((2, rows, cols));
    for r in 0..rows {
        for c in 0..cols {
            let w = weight_total[[r, c]];
            if w > 1e-12 {
                out[[0, r, c]] = (weighted_sum[[0, r, c]] / w) as f32;
                out[[1, r, c]] = (weighted_sum[[1, r, c]] / w) as f32;
            }
        }
    }
    DisplacementField::from_region(out, BboxXywh::full(full_shape), full_shape).expect("stitched array matches the full frame")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_grid_covers_the_full_frame() {
        let tiles = tile_grid((20, 20), 8, 2);
        let mut covered = Array2::<bool>::from_elem((20, 20), false);
        for t in &tiles {
            for r in t.y as usize..(t.y + t.h) as usize {
                for c in t.x as usize..(t.x + t.w) as usize {
                    covered[[r, c]] = true;
                }
            }
        }
        assert!(covered.iter().all(|&v| v));
    }

    #[test]
    fn memory_budget_flags_oversized_request() {
        let err = check_memory_budget((100_000, 100_000), 4, 1_000_000).unwrap_err();
        assert!(err.estimated_bytes > err.threshold_bytes);
    }

    #[test]
    fn micro_update_with_zero_field_is_additive_identity() {
        let shape = (16, 16);
        let existing = DisplacementField::zeros(shape);
        let update = DisplacementField::zeros(shape);
        let result = apply_micro_update(&existing, &update, shape).unwrap();
        assert!(result.is_zero_everywhere());
    }

    #[test]
    fn stitching_two_overlapping_zero_tiles_stays_zero() {
        let full_shape = (10, 10);
        let tiles = vec![
            (BboxXywh { x: 0, y: 0, w: 6, h: 10 }, DisplacementField::zeros((10, 6))),
            (BboxXywh { x: 4, y: 0, w: 6, h: 10 }, DisplacementField::zeros((10, 6))),
        ];
        let stitched = stitch_tiles(&tiles, full_shape);
        assert!(stitched.is_zero_everywhere());
    }
}
