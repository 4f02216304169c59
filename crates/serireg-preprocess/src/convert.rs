//! Bit-depth normalization: slide readers may hand back 8, 12, or 16-bit
//! samples; every preprocessing policy below operates on 8-bit data.

use ndarray::{Array2, Array3};

pub fn to_u8(img: &Array3<u16>) -> Array3<u8> {
    let max = img.iter().copied().max().unwrap_or(1).max(1);
    img.mapv(|v| ((v as u32 * 255) / max as u32) as u8)
}

pub fn channel(img: &Array3<u8>, index: usize) -> Array2<u8> {
    img.index_axis(ndarray::Axis(0), index).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_u8_scales_full_range_to_255() {
        let mut img = Array3::<u16>::zeros((1, 2, 2));
        img[[0, 0, 0]] = 4000;
        let out = to_u8(&img);
        assert_eq!(out[[0, 0, 0]], 255);
    }
}
