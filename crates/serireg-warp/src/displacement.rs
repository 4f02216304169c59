//! Dense two-band displacement fields (`dxdy`) and the bookkeeping needed
//! to keep them stored as small bounding-region arrays instead of full
//! canonical-frame buffers.

use {crate::affine::ShapeRc, ndarray::Array3, serde::{Deserialize, Serialize}};

/// Axis-aligned bounding box in `(x, y, w, h)` order, the convention used
/// throughout the data model for crop regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BboxXywh {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BboxXywh {
    pub fn full(shape: ShapeRc) -> Self {
        Self { x: 0, y: 0, w: shape.1 as u32, h: shape.0 as u32 }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x as f64 && y >= self.y as f64 && x < (self.x + self.w) as f64 && y < (self.y + self.h) as f64
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

/// A two-band float displacement field, stored only over `bbox` within a
/// canonical frame of `full_shape`. Band 0 holds `dx`, band 1 holds `dy`.
/// Every sample outside `bbox` is defined to be zero, matching the
/// invariant that non-rigid fields vanish outside the registered mask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplacementField {
    data: Array3<f32>,
    bbox: BboxXywh,
    full_shape: ShapeRc,
}

impl DisplacementField {
    pub fn zeros(full_shape: ShapeRc) -> Self {
        Self { data: Array3::zeros((2, full_shape.0, full_shape.1)), bbox: BboxXywh::full(full_shape), full_shape }
    }

    /// Build from a solver's sub-region result. `data` must have shape
    /// `(2, bbox.h, bbox.w)`.
    pub fn from_region(data: Array3<f32>, bbox: BboxXywh, full_shape: ShapeRc) -> anyhow::Result<Self> {
        let (bands, h, w) = data.dim();
        anyhow::ensure!(bands == 2, "displacement field must have exactly 2 bands, got {bands}");
        anyhow::ensure!(h == bbox.h as usize && w == bbox.w as usize, "region data {h}x{w} does not match bbox {bbox:?}");
        Ok(Self { data, bbox, full_shape })
    }

    pub fn full_shape(&self) -> ShapeRc {
        self.full_shape
    }

    pub fn bbox(&self) -> BboxXywh {
        self.bbox
    }

    pub fn is_zero_everywhere(&self) -> bool {
        self.data.iter().all(|v| *v == 0.0)
    }

    /// `pad_displacement`: materialize the full `full_shape` dense array,
    /// zero outside `bbox`.
    pub fn to_dense(&self) -> Array3<f32> {
        let mut out = Array3::zeros((2, self.full_shape.0, self.full_shape.1));
        for band in 0..2 {
            for r in 0..self.bbox.h as usize {
                for c in 0..self.bbox.w as usize {
                    out[[band, self.bbox.y as usize + r, self.bbox.x as usize + c]] = self.data[[band, r, c]];
                }
            }
        }
        out
    }

    /// Bilinear sample at floating-point canonical coordinates; zero
    /// outside `bbox`.
    pub fn sample(&self, x: f64, y: f64) -> [f32; 2] {
        if !self.bbox.contains(x, y) {
            return [0.0, 0.0];
        }
        let lx = x - self.bbox.x as f64;
        let ly = y - self.bbox.y as f64;
        let x0 = lx.floor().clamp(0.0, (self.bbox.w as f64 - 1.0).max(0.0)) as usize;
        let y0 = ly.floor().clamp(0.0, (self.bbox.h as f64 - 1.0).max(0.0)) as usize;
        let x1 = (x0 + 1).min(self.bbox.w.saturating_sub(1) as usize);
        let y1 = (y0 + 1).min(self.bbox.h.saturating_sub(1) as usize);
        let fx = (lx - x0 as f64).clamp(0.0, 1.0);
        let fy = (ly - y0 as f64).clamp(0.0, 1.0);
        let mut out = [0.0f32; 2];
        for band in 0..2 {
            let v00 = self.data[[band, y0, x0]] as f64;
            let v10 = self.data[[band, y0, x1]] as f64;
            let v01 = self.data[[band, y1, x0]] as f64;
            let v11 = self.data[[band, y1, x1]] as f64;
            let top = v00 * (1.0 - fx) + v10 * fx;
            let bottom = v01 * (1.0 - fx) + v11 * fx;
            out[band] = (top * (1.0 - fy) + bottom * fy) as f32;
        }
        out
    }

    /// Scaling law for dense fields: resize spatially to `out_shape` then
    /// scale each band componentwise by `out_shape / full_shape`.
    pub fn scaled_to(&self, out_shape: ShapeRc) -> DisplacementField {
        let dense = self.to_dense();
        let (rows_in, cols_in) = self.full_shape;
        let (rows_out, cols_out) = out_shape;
        let sy = rows_out as f64 / rows_in as f64;
        let sx = cols_out as f64 / cols_in as f64;
        let mut out = Array3::<f32>::zeros((2, rows_out, cols_out));
        for r in 0..rows_out {
            let src_y = ((r as f64 + 0.5) / sy - 0.5).clamp(0.0, (rows_in - 1) as f64);
            for c in 0..cols_out {
                let src_x = ((c as f64 + 0.5) / sx - 0.5).clamp(0.0, (cols_in - 1) as f64);
                let (x0, y0) = (src_x.floor() as usize, src_y.floor() as usize);
                let (x1, y1) = ((x0 + 1).min(cols_in - 1), (y0 + 1).min(rows_in - 1));
                let fx = src_x - x0 as f64;
                let fy = src_y - y0 as f64;
                for band in 0..2 {
                    let v00 = dense[[band, y0, x0]] as f64;
                    let v10 = dense[[band, y0, x1]] as f64;
                    let v01 = dense[[band, y1, x0]] as f64;
                    let v11 = dense[[band, y1, x1]] as f64;
                    let top = v00 * (1.0 - fx) + v10 * fx;
                    let bottom = v01 * (1.0 - fx) + v11 * fx;
                    let scale = if band == 0 { sx } else { sy };
                    out[[band, r, c]] = ((top * (1.0 - fy) + bottom * fy) * scale) as f32;
                }
            }
        }
        DisplacementField { data: out, bbox: BboxXywh::full(out_shape), full_shape: out_shape }
    }

    /// Add two fields defined over the same `full_shape`, taking the union
    /// of their bounding regions. Used for the micro-registrar's additive
    /// update and for tile stitching once tiles have been blended.
    pub fn add(&self, other: &DisplacementField) -> anyhow::Result<DisplacementField> {
        anyhow::ensure!(self.full_shape == other.full_shape, "cannot add displacement fields with different canonical shapes");
        let a = self.to_dense();
        let b = other.to_dense();
        Ok(DisplacementField { data: a + b, bbox: BboxXywh::full(self.full_shape), full_shape: self.full_shape })
    }

    /// Compose `self` (applied first) with `next` (applied second) into a
    /// single forward field: for a point `p`, the result is
    /// `self(p) + next(p + self(p))`. This is how serial-compose
    /// non-rigid registration accumulates displacement across the chain,
    /// and how cross-slide warps fold a dense part into an affine one.
    pub fn compose(&self, next: &DisplacementField) -> DisplacementField {
        let (rows, cols) = self.full_shape;
        let mut out = Array3::<f32>::zeros((2, rows, cols));
        for r in 0..rows {
            for c in 0..cols {
                let base = self.sample(c as f64, r as f64);
                let moved_x = c as f64 + base[0] as f64;
                let moved_y = r as f64 + base[1] as f64;
                let added = next.sample(moved_x, moved_y);
                out[[0, r, c]] = base[0] + added[0];
                out[[1, r, c]] = base[1] + added[1];
            }
        }
        DisplacementField { data: out, bbox: BboxXywh::full(self.full_shape), full_shape: self.full_shape }
    }
}

pub fn corners_of(shape: ShapeRc) -> [[f64; 2]; 4] {
    let (rows, cols) = shape;
    [[0.0, 0.0], [cols as f64, 0.0], [cols as f64, rows as f64], [0.0, rows as f64]]
}

/// `bbox_for_mask`: tight bounding box of the foreground (`> 0`) pixels of
/// a mask.
pub fn bbox_for_mask(mask: &ndarray::Array2<u8>) -> Option<BboxXywh> {
    let mut min_x = usize::MAX;
    let mut min_y = usize::MAX;
    let mut max_x = 0usize;
    let mut max_y = 0usize;
    let mut any = false;
    for ((y, x), v) in mask.indexed_iter() {
        if *v > 0 {
            any = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    any.then(|| BboxXywh { x: min_x as u32, y: min_y as u32, w: (max_x - min_x + 1) as u32, h: (max_y - min_y + 1) as u32 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_roundtrip_through_region() {
        let full_shape = (4, 4);
        let mut data = Array3::<f32>::zeros((2, 2, 2));
        data[[0, 0, 0]] = 1.5;
        data[[1, 1, 1]] = -2.0;
        let bbox = BboxXywh { x: 1, y: 1, w: 2, h: 2 };
        let field = DisplacementField::from_region(data, bbox, full_shape).unwrap();
        let dense = field.to_dense();
        assert_eq!(dense[[0, 1, 1]], 1.5);
        assert_eq!(dense[[1, 2, 2]], -2.0);
        assert_eq!(dense[[0, 0, 0]], 0.0);
    }

    #[test]
    fn sample_is_zero_outside_bbox() {
        let field = DisplacementField::zeros((4, 4));
        assert_eq!(field.sample(-1.0, -1.0), [0.0, 0.0]);
    }

    #[test]
    fn compose_of_zero_fields_is_zero() {
        let a = DisplacementField::zeros((8, 8));
        let b = DisplacementField::zeros((8, 8));
        assert!(a.compose(&b).is_zero_everywhere());
    }

    #[test]
    fn bbox_for_mask_finds_tight_box() {
        let mut mask = ndarray::Array2::<u8>::zeros((10, 10));
        mask[[2, 3]] = 255;
        mask[[5, 6]] = 255;
        let bbox = bbox_for_mask(&mask).unwrap();
        assert_eq!(bbox, BboxXywh { x: 3, y: 2, w: 4, h: 4 });
    }
}
