//! The persisted set artifact (§6/§12.1): everything needed to reload a
//! registered set on a different host except raw pixels, with every path
//! stored relative to the artifact's own directory and re-resolved
//! against it on load rather than carrying absolutes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serireg_preprocess::normalize::TargetStats;
use serireg_warp::{Affine, CropMode, ShapeRc};

const ARTIFACT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlideRecord {
    pub src: String,
    pub stack_idx: usize,
    pub fixed_neighbor: Option<usize>,
    pub shape_proc: ShapeRc,
    pub rigid_m: Affine,
    pub image_thumb_path: Option<PathBuf>,
    pub mask_thumb_path: Option<PathBuf>,
    pub bk_dxdy_path: Option<PathBuf>,
    pub fwd_dxdy_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetArtifact {
    pub version: u32,
    pub slides: Vec<SlideRecord>,
    pub reference_idx: usize,
    pub reg_shape: ShapeRc,
    pub crop_mode: CropMode,
    pub crop_mask_path: Option<PathBuf>,
    pub target_stats: Option<TargetStats>,
    pub solver_names: Vec<String>,
}

impl SetArtifact {
    pub fn new(slides: Vec<SlideRecord>, reference_idx: usize, reg_shape: ShapeRc, crop_mode: CropMode, target_stats: Option<TargetStats>, solver_names: Vec<String>) -> Self {
        Self { version: ARTIFACT_VERSION, slides, reference_idx, reg_shape, crop_mode, crop_mask_path: None, target_stats, solver_names }
    }

    /// Every path in this artifact is relative; resolve each against
    /// `base_dir` (the directory the artifact file itself lives in),
    /// producing a copy with absolute paths for the running process to
    /// use directly.
    pub fn resolve_paths(&self, base_dir: &Path) -> SetArtifact {
        let resolve = |p: &Option<PathBuf>| p.as_ref().map(|rel| base_dir.join(rel));
        SetArtifact {
            crop_mask_path: resolve(&self.crop_mask_path),
            slides: self
                .slides
                .iter()
                .map(|s| SlideRecord {
                    image_thumb_path: resolve(&s.image_thumb_path),
                    mask_thumb_path: resolve(&s.mask_thumb_path),
                    bk_dxdy_path: resolve(&s.bk_dxdy_path),
                    fwd_dxdy_path: resolve(&s.fwd_dxdy_path),
                    ..s.clone()
                })
                .collect(),
            ..self.clone()
        }
    }

    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Load and immediately resolve every path against the artifact
    /// file's own enclosing directory, per §6's re-resolution contract.
    pub fn load_from(path: &Path) -> anyhow::Result<SetArtifact> {
        let file = std::fs::File::open(path)?;
        let artifact: SetArtifact = serde_json::from_reader(file)?;
        anyhow::ensure!(artifact.version == ARTIFACT_VERSION, "unsupported set artifact version {}", artifact.version);
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(artifact.resolve_paths(base_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_artifact() -> SetArtifact {
        let slide = SlideRecord {
            src: "slide_a.svs".into(),
            stack_idx: 0,
            fixed_neighbor: None,
            shape_proc: (512, 512),
            rigid_m: Affine::IDENTITY,
            image_thumb_path: Some(PathBuf::from("images/slide_a.png")),
            mask_thumb_path: Some(PathBuf::from("masks/slide_a.png")),
            bk_dxdy_path: None,
            fwd_dxdy_path: None,
        };
        SetArtifact::new(vec![slide], 0, (512, 512), CropMode::Overlap, None, vec!["identity".into()])
    }

    #[test]
    fn round_trips_through_disk_with_relative_paths_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let artifact_path = dir.path().join("data").join("run.set.json");
        std::fs::create_dir_all(artifact_path.parent().unwrap()).unwrap();
        let artifact = sample_artifact();
        artifact.write_to(&artifact_path).unwrap();

        let raw = std::fs::read_to_string(&artifact_path).unwrap();
        assert!(raw.contains("\"images/slide_a.png\""), "on-disk path must stay relative");

        let loaded = SetArtifact::load_from(&artifact_path).unwrap();
        let resolved = loaded.slides[0].image_thumb_path.as_ref().unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("images/slide_a.png"));
    }

    #[test]
    fn rejects_mismatched_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.set.json");
        let mut artifact = sample_artifact();
        artifact.version = 999;
        artifact.write_to(&path).unwrap();
        assert!(SetArtifact::load_from(&path).is_err());
    }
}
