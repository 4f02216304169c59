//! Crop-mode masks computed once after rigid registration: `overlap`,
//! `reference`, and `none`.

use {
    crate::displacement::{bbox_for_mask, BboxXywh},
    ndarray::Array2,
    std::collections::VecDeque,
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CropMode {
    Overlap,
    Reference,
    None,
}

/// Hysteresis threshold over a per-pixel coverage count: pixels at or
/// above `high` seed the foreground; any pixel at or above `low` that is
/// 8-connected to a seed joins it. Mirrors `skimage.filters.apply_hysteresis_threshold`.
pub fn hysteresis_threshold(combo: &Array2<f64>, low: f64, high: f64) -> Array2<u8> {
    let (rows, cols) = combo.dim();
    let mut out = Array2::<u8>::zeros((rows, cols));
    let mut queue = VecDeque::new();
    for ((r, c), &v) in combo.indexed_iter() {
        if v >= high {
            out[[r, c]] = 255;
            queue.push_back((r, c));
        }
    }
    while let Some((r, c)) = queue.pop_front() {
        for dr in -1i64..=1 {
            for dc in -1i64..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let (nr, nc) = (r as i64 + dr, c as i64 + dc);
                if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                    continue;
                }
                let (nr, nc) = (nr as usize, nc as usize);
                if out[[nr, nc]] == 0 && combo[[nr, nc]] >= low {
                    out[[nr, nc]] = 255;
                    queue.push_back((nr, nc));
                }
            }
        }
    }
    out
}

/// `ndimage.binary_fill_holes`: any background region not reachable from
/// the image border is flipped to foreground.
pub fn fill_holes(mask: &Array2<u8>) -> Array2<u8> {
    let (rows, cols) = mask.dim();
    let mut reached = Array2::<bool>::from_elem((rows, cols), false);
    let mut queue = VecDeque::new();
    let is_bg = |r: usize, c: usize| mask[[r, c]] == 0;
    for r in 0..rows {
        for c in [0, cols.saturating_sub(1)] {
            if is_bg(r, c) && !reached[[r, c]] {
                reached[[r, c]] = true;
                queue.push_back((r, c));
            }
        }
    }
    for c in 0..cols {
        for r in [0, rows.saturating_sub(1)] {
            if is_bg(r, c) && !reached[[r, c]] {
                reached[[r, c]] = true;
                queue.push_back((r, c));
            }
        }
    }
    while let Some((r, c)) = queue.pop_front() {
        for (dr, dc) in [(-1i64, 0i64), (1, 0), (0, -1), (0, 1)] {
            let (nr, nc) = (r as i64 + dr, c as i64 + dc);
            if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                continue;
            }
            let (nr, nc) = (nr as usize, nc as usize);
            if is_bg(nr, nc) && !reached[[nr, nc]] {
                reached[[nr, nc]] = true;
                queue.push_back((nr, nc));
            }
        }
    }
    Array2::from_shape_fn((rows, cols), |(r, c)| if mask[[r, c]] != 0 || !reached[[r, c]] { 255 } else { 0 })
}

/// `overlap` crop: the hysteresis-thresholded, hole-filled intersection of
/// every slide's tissue mask, already warped into the canonical frame.
/// Falls back to the reference slide's own footprint when no pixel is
/// covered by every slide (the boundary case of a zero-intersection set).
pub fn overlap_crop_mask(warped_masks: &[Array2<u8>], reference_mask: &Array2<u8>) -> (Array2<u8>, BboxXywh) {
    assert!(!warped_masks.is_empty(), "overlap crop needs at least one mask");
    let shape = warped_masks[0].dim();
    let n = warped_masks.len() as f64;
    let mut combo = Array2::<f64>::zeros(shape);
    for mask in warped_masks {
        for ((r, c), &v) in mask.indexed_iter() {
            if v > 0 {
                combo[[r, c]] += 1.0;
            }
        }
    }
    let thresholded = hysteresis_threshold(&combo, 0.5, n - 0.5);
    let filled = fill_holes(&thresholded);
    match bbox_for_mask(&filled) {
        Some(bbox) => (filled, bbox),
        None => reference_crop_mask(reference_mask),
    }
}

/// `reference` crop: the reference slide's own warped footprint.
pub fn reference_crop_mask(reference_mask_warped: &Array2<u8>) -> (Array2<u8>, BboxXywh) {
    let bbox = bbox_for_mask(reference_mask_warped).unwrap_or(BboxXywh { x: 0, y: 0, w: reference_mask_warped.dim().1 as u32, h: reference_mask_warped.dim().0 as u32 });
    (reference_mask_warped.clone(), bbox)
}

/// `none` crop: the full canonical frame.
pub fn none_crop_mask(shape: (usize, usize)) -> (Array2<u8>, BboxXywh) {
    (Array2::from_elem(shape, 255u8), BboxXywh { x: 0, y: 0, w: shape.1 as u32, h: shape.0 as u32 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hysteresis_keeps_weak_pixels_connected_to_strong_seed() {
        let mut combo = Array2::<f64>::zeros((5, 5));
        combo[[2, 2]] = 3.0;
        combo[[2, 3]] = 1.0;
        combo[[4, 4]] = 1.0; // weak but disconnected from any seed
        let out = hysteresis_threshold(&combo, 0.5, 2.5);
        assert_eq!(out[[2, 2]], 255);
        assert_eq!(out[[2, 3]], 255);
        assert_eq!(out[[4, 4]], 0);
    }

    #[test]
    fn fill_holes_closes_interior_background() {
        let mut mask = Array2::<u8>::from_elem((5, 5), 255);
        mask[[2, 2]] = 0;
        let filled = fill_holes(&mask);
        assert_eq!(filled[[2, 2]], 255);
    }

    #[test]
    fn overlap_falls_back_to_reference_when_empty() {
        let a = Array2::<u8>::zeros((4, 4));
        let mut reference = Array2::<u8>::zeros((4, 4));
        reference[[1, 1]] = 255;
        let (_mask, bbox) = overlap_crop_mask(&[a], &reference);
        assert_eq!(bbox, BboxXywh { x: 1, y: 1, w: 1, h: 1 });
    }
}
