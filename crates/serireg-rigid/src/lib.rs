//! Rigid registrar (C5): per-pair transform fitting with a divergence
//! retry sequence and optional reflection search, stack-wide composition
//! into a shared reference frame, partial-rigid overrides, and canonical
//! placement.

pub mod canonical;
pub mod divergence;
pub mod error;
pub mod full_rigid;
pub mod partial_rigid;
pub mod reflections;

pub use canonical::{place_in_canonical_frame, CanonicalPlacement};
pub use divergence::{fit_with_retries, DivergenceOutcome};
pub use error::{RigidFitDiverged, UnderspecifiedPartialRigid};
pub use full_rigid::{fit_full_rigid_chain, FullRigidConfig, PairCorrespondence, SlideFit};
pub use partial_rigid::{fit_partial_rigid_chain, rescale_known, KnownMatrix};
pub use reflections::fit_with_reflection_search;
