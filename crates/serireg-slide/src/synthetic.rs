//! An in-memory `SlideReader` used by this crate's own tests and by the
//! test fixtures of every downstream crate, standing in for a concrete
//! backend (out of scope per spec.md item (i)).

use {
    crate::{
        error::SlideError,
        modality::Modality,
        reader::{ChannelDescriptor, PhysicalPixelSize, SlideReader},
    },
    ndarray::Array3,
};

/// A deterministic checkerboard pyramid: level 0 is generated directly,
/// every coarser level is a 2x box-downsample of the one above it, so
/// reads at any level are self-consistent.
pub struct SyntheticReader {
    levels: Vec<Array3<u16>>,
    dims: Vec<(u32, u32)>,
    channels: Vec<ChannelDescriptor>,
    modality: Modality,
}

impl SyntheticReader {
    pub fn checkerboard(level_dims: Vec<(u32, u32)>, channel_count: usize, modality: Modality) -> Self {
        let full = level_dims[0];
        let base = Array3::from_shape_fn((channel_count, full.1 as usize, full.0 as usize), |(c, y, x)| {
            let on = ((x / 16) + (y / 16) + c as usize) % 2 == 0;
            if on {
                4000
            } else {
                400
            }
        });
        let mut levels = vec![base];
        for &(w, h) in level_dims.iter().skip(1) {
            let prev = levels.last().unwrap();
            levels.push(resample(prev, h as usize, w as usize));
        }
        let channels = (0..channel_count).map(|i| ChannelDescriptor { name: format!("ch{i}"), color_hint: None }).collect();
        Self { levels, dims: level_dims, channels, modality }
    }
}

fn resample(src: &Array3<u16>, out_rows: usize, out_cols: usize) -> Array3<u16> {
    let (channels, rows, cols) = src.dim();
    Array3::from_shape_fn((channels, out_rows, out_cols), |(c, y, x)| {
        let sy = (y * rows / out_rows).min(rows - 1);
        let sx = (x * cols / out_cols).min(cols - 1);
        src[[c, sy, sx]]
    })
}

impl SlideReader for SyntheticReader {
    fn dimensions(&self) -> &[(u32, u32)] {
        &self.dims
    }

    fn physical_pixel(&self, level: usize) -> Result<PhysicalPixelSize, SlideError> {
        if level >= self.dims.len() {
            return Err(SlideError::MissingMetadata { src: "synthetic".into(), what: "level out of range" });
        }
        Ok(PhysicalPixelSize { x: 0.25, y: 0.25, unit: "micron" })
    }

    fn channels(&self) -> &[ChannelDescriptor] {
        &self.channels
    }

    fn guess_modality(&self) -> Modality {
        self.modality
    }

    fn read(&self, level: usize, xywh: Option<(u32, u32, u32, u32)>) -> anyhow::Result<Array3<u16>> {
        let full = self.levels.get(level).ok_or_else(|| anyhow::anyhow!("level {level} out of range"))?;
        match xywh {
            None => Ok(full.clone()),
            Some((x, y, w, h)) => {
                let (channels, rows, cols) = full.dim();
                anyhow::ensure!((x + w) as usize <= cols && (y + h) as usize <= rows, "region out of bounds");
                let mut out = Array3::<u16>::zeros((channels, h as usize, w as usize));
                for c in 0..channels {
                    for ry in 0..h as usize {
                        for rx in 0..w as usize {
                            out[[c, ry, rx]] = full[[c, y as usize + ry, x as usize + rx]];
                        }
                    }
                }
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pyramid_levels_have_matching_channel_count() {
        let reader = SyntheticReader::checkerboard(vec![(64, 64), (32, 32)], 2, Modality::Brightfield);
        assert_eq!(reader.read(0, None).unwrap().dim().0, 2);
        assert_eq!(reader.read(1, None).unwrap().dim().0, 2);
    }

    #[test]
    fn region_read_matches_full_read_subregion() {
        let reader = SyntheticReader::checkerboard(vec![(32, 32)], 1, Modality::Fluorescence);
        let full = reader.read(0, None).unwrap();
        let region = reader.read(0, Some((4, 4, 8, 8))).unwrap();
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(region[[0, y, x]], full[[0, y + 4, x + 4]]);
            }
        }
    }
}
