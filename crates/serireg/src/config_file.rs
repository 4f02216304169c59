//! YAML-backed run configuration (§10.3), following this repository's own
//! config style: a top-level struct with `deny_unknown_fields`, a
//! `derivative`-derived `Default`, and a `find`/`read`/`write_default`
//! trio for the CLI to call into.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tap::prelude::*;
use tracing::{debug, info, warn};

use serireg_preprocess::NormalizationMode;
use serireg_warp::CropMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    GridPatch,
}

impl Default for DetectorKind {
    fn default() -> Self {
        DetectorKind::GridPatch
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    Identity,
    ConstantShift,
}

impl Default for SolverKind {
    fn default() -> Self {
        SolverKind::Identity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionStrategy {
    SerialCompose,
    AlignToReference,
}

impl Default for CompositionStrategy {
    fn default() -> Self {
        CompositionStrategy::SerialCompose
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, derivative::Derivative)]
#[derivative(Default)]
#[serde(deny_unknown_fields)]
pub struct DetectorConfig {
    pub kind: DetectorKind,
    #[derivative(Default(value = "500"))]
    pub ransac_iterations: usize,
    #[derivative(Default(value = "4.0"))]
    pub ransac_inlier_threshold_px: f64,
    #[derivative(Default(value = "false"))]
    pub check_reflections: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, derivative::Derivative)]
#[derivative(Default)]
#[serde(deny_unknown_fields)]
pub struct NonRigidConfig {
    pub solver: SolverKind,
    pub composition: CompositionStrategy,
    /// Only consulted when `composition` is `serial_compose`: warp the
    /// moving image by the chain's accumulated displacement before each
    /// solve (`true`), or solve every neighbor pair against its un-warped
    /// image (`false`).
    #[derivative(Default(value = "true"))]
    pub compose: bool,
    #[derivative(Default(value = "false"))]
    pub micro_registration: bool,
    #[derivative(Default(value = "2_000_000_000"))]
    pub micro_memory_threshold_bytes: u64,
    #[derivative(Default(value = "512"))]
    pub micro_tile_size: usize,
    #[derivative(Default(value = "64"))]
    pub micro_tile_overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, derivative::Derivative)]
#[derivative(Default)]
#[serde(deny_unknown_fields)]
pub struct RegistrationConfig {
    pub slides: Vec<PathBuf>,
    /// Index into `slides`, or `None` to auto-select via the greedy chain
    /// order's natural endpoint (the first slide in stack order).
    pub reference: Option<usize>,
    #[derivative(Default(value = "CropMode::Overlap"))]
    pub crop_mode: CropMode,
    pub detector: DetectorConfig,
    pub non_rigid: NonRigidConfig,
    #[derivative(Default(value = "2048"))]
    pub max_img_dim: u32,
    #[derivative(Default(value = "1024"))]
    pub max_proc_dim: u32,
    #[derivative(Default(value = "NormalizationMode::ImgStats"))]
    pub normalization_mode: NormalizationMode,
    #[derivative(Default(value = "num_cpus::get()"))]
    pub num_workers: usize,
    #[derivative(Default(value = "0"))]
    pub seed: u64,
    #[derivative(Default(value = "PathBuf::from(\"serireg_output\")"))]
    pub output_dir: PathBuf,
}

pub static CONFIG_FILE_NAME: &str = "serireg.yaml";

impl RegistrationConfig {
    pub fn write_default() -> Result<String> {
        Self::default()
            .pipe_ref(serde_yaml::to_string)
            .context("serialization failed")
            .map(|config| format!("# default {CONFIG_FILE_NAME}, generated with {} {}\n# edit it according to your needs:\n{config}", clap::crate_name!(), clap::crate_version!()))
    }

    pub fn read(path: &Path) -> Result<(PathBuf, Self)> {
        path.exists()
            .then(|| path.to_owned())
            .with_context(|| format!("config path [{}] does not exist", path.display()))
            .tap_ok(|config| info!("found config at '{}'", config.display()))
            .and_then(|config_path| {
                std::fs::read_to_string(&config_path)
                    .context("reading file")
                    .and_then(|config| serde_yaml::from_str::<Self>(&config).context("parsing config file"))
                    .map(|config| (config_path, config))
            })
            .with_context(|| format!("getting [{CONFIG_FILE_NAME}]"))
            .tap_err(|e| warn!("{e:?}"))
            .tap_ok(|config| debug!("{config:?}"))
    }

    /// Resolve `explicit` if given, else look for `./serireg.yaml` in the
    /// current directory.
    pub fn find(explicit: &Path) -> Result<(PathBuf, Self)> {
        if explicit.exists() {
            return Self::read(explicit);
        }
        let cwd_default = std::env::current_dir().context("reading current directory")?.join(CONFIG_FILE_NAME);
        Self::read(&cwd_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_yaml() {
        let config = RegistrationConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: RegistrationConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.max_img_dim, config.max_img_dim);
        assert_eq!(parsed.crop_mode, config.crop_mode);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let yaml = "slides: []\nbogus_field: 1\n";
        assert!(serde_yaml::from_str::<RegistrationConfig>(yaml).is_err());
    }
}
