//! Opening a configured slide path into a `SlideReader` (§6: "slide reader
//! (consumed)" is named only at its interface; no concrete backend ships
//! with this workspace). Until a real backend is wired in, every path
//! resolves to a deterministic synthetic pyramid seeded from the path
//! itself, so the orchestrator stays runnable end to end against
//! `serireg-slide`'s own test fixture.

use std::{
    hash::{Hash, Hasher},
    path::Path,
};

use serireg_slide::{Modality, SlideReader, SyntheticReader};

fn seed_from_path(path: &Path) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish()
}

/// Fluorescence slides conventionally carry channel-count hints like
/// `dapi`/`fl` in their filename; anything else is treated as a 3-channel
/// brightfield scan, mirroring `serireg_slide::guess_modality`'s own
/// channel-count heuristic.
fn guess_from_name(path: &Path) -> (Modality, usize) {
    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("").to_lowercase();
    if name.contains("dapi") || name.contains("fl") || name.contains("fluor") {
        (Modality::Fluorescence, 4)
    } else {
        (Modality::Brightfield, 3)
    }
}

pub fn open_slide(path: &Path) -> anyhow::Result<Box<dyn SlideReader>> {
    let seed = seed_from_path(path);
    let (modality, channels) = guess_from_name(path);
    let base = 1024 + (seed % 3072) as u32;
    let dims = vec![(base, base), (base / 2, base / 2), (base / 4, base / 4)];
    Ok(Box::new(SyntheticReader::checkerboard(dims, channels, modality)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_path_opens_to_the_same_dimensions() {
        let a = open_slide(Path::new("/data/set1/slide_003.tif")).unwrap();
        let b = open_slide(Path::new("/data/set1/slide_003.tif")).unwrap();
        assert_eq!(a.dimensions(), b.dimensions());
    }

    #[test]
    fn dapi_filename_is_read_as_fluorescence() {
        let reader = open_slide(Path::new("/data/set1/dapi_channel.tif")).unwrap();
        assert_eq!(reader.guess_modality(), Modality::Fluorescence);
    }

    #[test]
    fn plain_filename_is_read_as_brightfield() {
        let reader = open_slide(Path::new("/data/set1/he_stain.tif")).unwrap();
        assert_eq!(reader.guess_modality(), Modality::Brightfield);
    }
}
