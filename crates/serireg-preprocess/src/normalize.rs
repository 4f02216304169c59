//! Cross-image intensity normalization: every processed image is shifted
//! to match pooled statistics gathered across the whole set (§4.3).

use {ndarray::Array2, serde::{Deserialize, Serialize}, serde_with::serde_as};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizationMode {
    HistoMatch,
    ImgStats,
}

/// Pooled target statistics computed once across every processed image in
/// a set, then applied uniformly.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TargetStats {
    Histogram(#[serde_as(as = "[_; 256]")] [u32; 256]),
    MeanStd { mean: f64, std: f64 },
}

pub fn pool_stats(images: &[Array2<u8>], mode: NormalizationMode) -> TargetStats {
    match mode {
        NormalizationMode::HistoMatch => {
            let mut hist = [0u32; 256];
            for img in images {
                for &v in img.iter() {
                    hist[v as usize] += 1;
                }
            }
            TargetStats::Histogram(hist)
        }
        NormalizationMode::ImgStats => {
            let mut sum = 0.0f64;
            let mut count = 0.0f64;
            for img in images {
                for &v in img.iter() {
                    sum += v as f64;
                    count += 1.0;
                }
            }
            let mean = if count > 0.0 { sum / count } else { 0.0 };
            let mut var_sum = 0.0f64;
            for img in images {
                for &v in img.iter() {
                    var_sum += (v as f64 - mean).powi(2);
                }
            }
            let std = if count > 0.0 { (var_sum / count).sqrt() } else { 1.0 };
            TargetStats::MeanStd { mean, std: std.max(1e-6) }
        }
    }
}

/// Apply the pooled target to a single image, matching whichever mode the
/// target was computed in.
pub fn normalize_to_target(img: &Array2<u8>, target: &TargetStats) -> Array2<u8> {
    match target {
        TargetStats::Histogram(target_hist) => histo_match(img, target_hist),
        TargetStats::MeanStd { mean, std } => img_stats_shift(img, *mean, *std),
    }
}

fn cdf_from_hist(hist: &[u32; 256]) -> [f64; 256] {
    let total: u32 = hist.iter().sum();
    let mut out = [0.0f64; 256];
    if total == 0 {
        return out;
    }
    let mut acc = 0u32;
    for (i, &h) in hist.iter().enumerate() {
        acc += h;
        out[i] = acc as f64 / total as f64;
    }
    out
}

/// `histo_match`: map each source intensity to the target intensity whose
/// pooled CDF is closest, the standard histogram-specification algorithm.
fn histo_match(img: &Array2<u8>, target_hist: &[u32; 256]) -> Array2<u8> {
    let mut source_hist = [0u32; 256];
    for &v in img.iter() {
        source_hist[v as usize] += 1;
    }
    let source_cdf = cdf_from_hist(&source_hist);
    let target_cdf = cdf_from_hist(target_hist);
    let mut lut = [0u8; 256];
    for (s, lut_s) in lut.iter_mut().enumerate() {
        let target_value = source_cdf[s];
        let mut best = 0usize;
        let mut best_diff = f64::MAX;
        for (t, &tc) in target_cdf.iter().enumerate() {
            let diff = (tc - target_value).abs();
            if diff < best_diff {
                best_diff = diff;
                best = t;
            }
        }
        *lut_s = best as u8;
    }
    img.mapv(|v| lut[v as usize])
}

fn img_stats_shift(img: &Array2<u8>, target_mean: f64, target_std: f64) -> Array2<u8> {
    let count = img.len() as f64;
    let mean = img.iter().map(|&v| v as f64).sum::<f64>() / count;
    let var = img.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / count;
    let std = var.sqrt().max(1e-6);
    img.mapv(|v| (((v as f64 - mean) / std) * target_std + target_mean).round().clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn img_stats_matches_target_mean() {
        let img = Array2::<u8>::from_elem((10, 10), 50);
        let target = TargetStats::MeanStd { mean: 150.0, std: 1.0 };
        let out = normalize_to_target(&img, &target);
        let mean = out.iter().map(|&v| v as f64).sum::<f64>() / out.len() as f64;
        assert!((mean - 150.0).abs() < 2.0);
    }

    #[test]
    fn histo_match_is_identity_when_pooled_from_itself() {
        let img = Array2::<u8>::from_shape_fn((4, 4), |(r, c)| ((r * 4 + c) * 17) as u8);
        let target = pool_stats(&[img.clone()], NormalizationMode::HistoMatch);
        let out = normalize_to_target(&img, &target);
        assert_eq!(out, img);
    }
}
