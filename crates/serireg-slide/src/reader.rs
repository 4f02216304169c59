//! The slide reader capability interface (§6 "Slide reader (consumed)").
//! Concrete readers are out of scope; this crate only fixes the contract
//! and the adaptive level-selection logic layered on top of it.

use {
    crate::{error::SlideError, modality::Modality},
    ndarray::Array3,
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalPixelSize {
    pub x: f64,
    pub y: f64,
    pub unit: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    pub name: String,
    pub color_hint: Option<[u8; 3]>,
}

/// A caller-supplied declaration that stands in for per-file metadata a
/// scanner omits, shared across every slide in one acquisition series
/// (SPEC_FULL.md §4.2/§11.1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelSizeOverride {
    pub x: f64,
    pub y: f64,
    pub unit: &'static str,
}

/// Minimum surface a concrete slide backend must expose. `read` must not
/// mutate any shared state and may be called from multiple worker threads
/// concurrently for disjoint regions.
pub trait SlideReader: Send + Sync {
    /// Level dimensions as `(width, height)`, largest (level 0) first.
    /// Invariant: areas are strictly non-increasing down the list.
    fn dimensions(&self) -> &[(u32, u32)];

    fn physical_pixel(&self, level: usize) -> Result<PhysicalPixelSize, SlideError>;

    fn channels(&self) -> &[ChannelDescriptor];

    fn guess_modality(&self) -> Modality;

    /// Read a region at `level`; `xywh` defaults to the full level extent.
    /// Returns a channels-first `(c, rows, cols)` buffer.
    fn read(&self, level: usize, xywh: Option<(u32, u32, u32, u32)>) -> anyhow::Result<Array3<u16>>;
}

/// Choose the largest level whose longer side is `<= max_dim`; if none
/// qualifies, read the smallest level and downscale it in memory.
pub fn select_level(reader: &dyn SlideReader, max_dim: u32) -> usize {
    reader
        .dimensions()
        .iter()
        .enumerate()
        .filter(|(_, (w, h))| (*w).max(*h) <= max_dim)
        .max_by_key(|(_, (w, h))| (*w).max(*h))
        .map(|(level, _)| level)
        .unwrap_or_else(|| reader.dimensions().len() - 1)
}

/// `read_scaled`: read the adaptively-selected level and, if it still
/// exceeds `max_dim`, box-downsample it in memory to fit.
pub fn read_scaled(reader: &dyn SlideReader, max_dim: u32) -> anyhow::Result<Array3<u16>> {
    let level = select_level(reader, max_dim);
    let img = reader.read(level, None)?;
    let (_, rows, cols) = img.dim();
    let longest = rows.max(cols) as u32;
    if longest <= max_dim {
        return Ok(img);
    }
    let scale = max_dim as f64 / longest as f64;
    let new_rows = ((rows as f64 * scale).round() as usize).max(1);
    let new_cols = ((cols as f64 * scale).round() as usize).max(1);
    Ok(box_downsample(&img, new_rows, new_cols))
}

fn box_downsample(img: &Array3<u16>, out_rows: usize, out_cols: usize) -> Array3<u16> {
    let (channels, rows, cols) = img.dim();
    let mut out = Array3::<u16>::zeros((channels, out_rows, out_cols));
    for oy in 0..out_rows {
        let y0 = oy * rows / out_rows;
        let y1 = (((oy + 1) * rows).div_ceil(out_rows)).max(y0 + 1).min(rows);
        for ox in 0..out_cols {
            let x0 = ox * cols / out_cols;
            let x1 = (((ox + 1) * cols).div_ceil(out_cols)).max(x0 + 1).min(cols);
            let count = ((y1 - y0) * (x1 - x0)) as u32;
            for c in 0..channels {
                let mut sum = 0u32;
                for y in y0..y1 {
                    for x in x0..x1 {
                        sum += img[[c, y, x]] as u32;
                    }
                }
                out[[c, oy, ox]] = (sum / count) as u16;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use {super::*, crate::synthetic::SyntheticReader};

    #[test]
    fn select_level_picks_largest_fitting_level() {
        let reader = SyntheticReader::checkerboard(vec![(4000, 4000), (2000, 2000), (500, 500)], 1, Modality::Fluorescence);
        assert_eq!(select_level(&reader, 2000), 1);
    }

    #[test]
    fn select_level_falls_back_to_smallest_when_none_fit() {
        let reader = SyntheticReader::checkerboard(vec![(4000, 4000), (2000, 2000)], 1, Modality::Fluorescence);
        assert_eq!(select_level(&reader, 100), 1);
    }

    #[test]
    fn read_scaled_downsamples_when_smallest_level_still_too_big() {
        let reader = SyntheticReader::checkerboard(vec![(200, 200)], 1, Modality::Fluorescence);
        let out = read_scaled(&reader, 50).unwrap();
        assert!(out.dim().1 <= 50 && out.dim().2 <= 50);
    }
}
