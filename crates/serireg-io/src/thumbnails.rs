//! PNG thumbnail and preview writers (§6): per-slide stage thumbnails plus
//! the overlap/deformation-grid composite previews. Out of scope for this
//! crate are the full pyramidal registered-slide outputs, which go through
//! the external `PyramidEncoder` trait (§11.4) instead.

use std::path::Path;

use image::{GrayImage, RgbImage};
use ndarray::Array2;

pub fn write_grayscale_png(path: &Path, img: &Array2<u8>) -> anyhow::Result<()> {
    let (rows, cols) = img.dim();
    let buf = GrayImage::from_fn(cols as u32, rows as u32, |x, y| image::Luma([img[[y as usize, x as usize]]]));
    buf.save(path)?;
    Ok(())
}

/// A three-way overlap preview: `before` in the red channel, `after` in
/// the green channel, matching the common red/green registration-overlay
/// convention so misalignment shows up as color fringing.
pub fn write_overlap_preview(path: &Path, before: &Array2<u8>, after: &Array2<u8>) -> anyhow::Result<()> {
    anyhow::ensure!(before.dim() == after.dim(), "overlap preview inputs must share a shape");
    let (rows, cols) = before.dim();
    let buf = RgbImage::from_fn(cols as u32, rows as u32, |x, y| {
        let (r, c) = (y as usize, x as usize);
        image::Rgb([before[[r, c]], after[[r, c]], 0])
    });
    buf.save(path)?;
    Ok(())
}

/// A sparse deformation-grid preview: draws a regular grid warped by
/// `sample`, visualizing a displacement field's magnitude and direction at
/// a glance.
pub fn write_deformation_grid_preview(path: &Path, shape: (usize, usize), spacing: usize, sample: impl Fn(f64, f64) -> [f32; 2]) -> anyhow::Result<()> {
    let (rows, cols) = shape;
    let mut buf = GrayImage::from_pixel(cols as u32, rows as u32, image::Luma([0]));
    let mut plot = |x: f64, y: f64| {
        if x >= 0.0 && y >= 0.0 && (x as u32) < cols as u32 && (y as u32) < rows as u32 {
            buf.put_pixel(x as u32, y as u32, image::Luma([255]));
        }
    };
    let mut y = 0usize;
    while y < rows {
        for x in 0..cols {
            let d = sample(x as f64, y as f64);
            plot(x as f64 + d[0] as f64, y as f64 + d[1] as f64);
        }
        y += spacing;
    }
    let mut x = 0usize;
    while x < cols {
        for y in 0..rows {
            let d = sample(x as f64, y as f64);
            plot(x as f64 + d[0] as f64, y as f64 + d[1] as f64);
        }
        x += spacing;
    }
    buf.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_readable_grayscale_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thumb.png");
        let img = Array2::<u8>::from_shape_fn((16, 20), |(r, c)| ((r + c) % 256) as u8);
        write_grayscale_png(&path, &img).unwrap();
        let loaded = image::open(&path).unwrap().into_luma8();
        assert_eq!(loaded.dimensions(), (20, 16));
    }

    #[test]
    fn overlap_preview_rejects_mismatched_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlap.png");
        let a = Array2::<u8>::zeros((4, 4));
        let b = Array2::<u8>::zeros((4, 5));
        assert!(write_overlap_preview(&path, &a, &b).is_err());
    }
}
