//! The output directory layout the orchestrator writes into (§6).

use std::path::{Path, PathBuf};

pub struct SetLayout {
    root: PathBuf,
}

impl SetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images(&self) -> PathBuf {
        self.root.join("images")
    }

    pub fn processed(&self) -> PathBuf {
        self.root.join("processed")
    }

    pub fn masks(&self) -> PathBuf {
        self.root.join("masks")
    }

    pub fn rigid_registration(&self) -> PathBuf {
        self.root.join("rigid_registration")
    }

    pub fn non_rigid_registration(&self) -> PathBuf {
        self.root.join("non_rigid_registration")
    }

    pub fn deformation_fields(&self) -> PathBuf {
        self.root.join("deformation_fields")
    }

    pub fn overlaps(&self) -> PathBuf {
        self.root.join("overlaps")
    }

    pub fn data(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn data_displacements(&self) -> PathBuf {
        self.data().join("displacements")
    }

    pub fn micro_registration(&self) -> PathBuf {
        self.root.join("micro_registration")
    }

    /// Create every directory in the layout, even ones a given run will
    /// not populate (e.g. `micro_registration/` when micro-registration is
    /// disabled) — cheap, and keeps the tree shape stable across runs.
    pub fn create_all(&self) -> std::io::Result<()> {
        for dir in [
            self.images(),
            self.processed(),
            self.masks(),
            self.rigid_registration(),
            self.non_rigid_registration(),
            self.deformation_fields(),
            self.overlaps(),
            self.data(),
            self.data_displacements(),
            self.micro_registration(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_all_makes_every_declared_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SetLayout::new(dir.path());
        layout.create_all().unwrap();
        assert!(layout.data_displacements().is_dir());
        assert!(layout.micro_registration().is_dir());
    }
}
