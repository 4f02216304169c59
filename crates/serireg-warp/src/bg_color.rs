//! Background fill color selection for warped images, so pixels that map
//! outside the source slide's footprint match the slide's own background
//! instead of rendering as black.

use ndarray::Array3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Brightfield,
    Fluorescence,
}

/// Brightfield slides are scanned on a bright, usually near-white,
/// background; fluorescence images are dark outside tissue. Either way the
/// background color is picked from the image itself rather than assumed,
/// since scanners vary.
pub fn estimate_background(img: &Array3<u8>, modality: Modality) -> Vec<u8> {
    match modality {
        Modality::Brightfield => brightest_pixel(img),
        Modality::Fluorescence => darkest_pixel_across_channels(img),
    }
}

/// Approximates perceptual lightness with the Rec. 601 luma weights and
/// returns the channel values of whichever pixel scores highest, standing
/// in for a full CAM16-UCS lightness search.
fn brightest_pixel(img: &Array3<u8>) -> Vec<u8> {
    let (channels, rows, cols) = img.dim();
    let weights = luma_weights(channels);
    let mut best_score = -1.0f64;
    let mut best = vec![255u8; channels];
    for y in 0..rows {
        for x in 0..cols {
            let mut score = 0.0;
            for c in 0..channels {
                score += img[[c, y, x]] as f64 * weights[c];
            }
            if score > best_score {
                best_score = score;
                best = (0..channels).map(|c| img[[c, y, x]]).collect();
            }
        }
    }
    best
}

fn darkest_pixel_across_channels(img: &Array3<u8>) -> Vec<u8> {
    let (channels, rows, cols) = img.dim();
    let mut best_score = u32::MAX;
    let mut best = vec![0u8; channels];
    for y in 0..rows {
        for x in 0..cols {
            let score: u32 = (0..channels).map(|c| img[[c, y, x]] as u32).sum();
            if score < best_score {
                best_score = score;
                best = (0..channels).map(|c| img[[c, y, x]]).collect();
            }
        }
    }
    best
}

fn luma_weights(channels: usize) -> Vec<f64> {
    match channels {
        1 => vec![1.0],
        3 | 4 => {
            let mut w = vec![0.299, 0.587, 0.114];
            w.resize(channels, 0.0);
            w
        }
        n => vec![1.0 / n as f64; n],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightfield_picks_the_brightest_pixel() {
        let mut img = Array3::<u8>::from_elem((3, 2, 2), 10);
        for c in 0..3 {
            img[[c, 1, 1]] = 250;
        }
        let bg = estimate_background(&img, Modality::Brightfield);
        assert_eq!(bg, vec![250, 250, 250]);
    }

    #[test]
    fn fluorescence_picks_the_darkest_pixel() {
        let mut img = Array3::<u8>::from_elem((2, 2, 2), 200);
        for c in 0..2 {
            img[[c, 0, 0]] = 3;
        }
        let bg = estimate_background(&img, Modality::Fluorescence);
        assert_eq!(bg, vec![3, 3]);
    }
}
