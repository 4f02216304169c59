//! Orchestrator I/O (C8 support): the persisted set artifact, CSV error
//! summary, output directory layout, and PNG thumbnail/preview writers.
//! The orchestrator binary is the only caller of this crate — every other
//! crate in the workspace is pure compute.

pub mod csv_summary;
pub mod layout;
pub mod set_artifact;
pub mod thumbnails;

pub use csv_summary::{rtre, write_summary_csv, SummaryRow};
pub use layout::SetLayout;
pub use set_artifact::{SetArtifact, SlideRecord};
pub use thumbnails::{write_deformation_grid_preview, write_grayscale_png, write_overlap_preview};
