//! Brightfield vs. fluorescence discrimination, used both as an explicit
//! caller override and as a fallback heuristic.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modality {
    Brightfield,
    Fluorescence,
}

/// Channel count + bit depth heuristic used when a reader cannot state its
/// own modality: brightfield slides are conventionally 3-channel 8-bit
/// RGB; anything else (single-channel, >3 channels, or >8-bit) is treated
/// as fluorescence.
pub fn guess_modality(channel_count: usize, bits_per_sample: u16) -> Modality {
    if channel_count == 3 && bits_per_sample == 8 {
        Modality::Brightfield
    } else {
        Modality::Fluorescence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_channel_eight_bit_is_brightfield() {
        assert_eq!(guess_modality(3, 8), Modality::Brightfield);
    }

    #[test]
    fn single_channel_is_fluorescence() {
        assert_eq!(guess_modality(1, 16), Modality::Fluorescence);
    }

    #[test]
    fn four_channel_eight_bit_is_fluorescence() {
        assert_eq!(guess_modality(4, 8), Modality::Fluorescence);
    }
}
