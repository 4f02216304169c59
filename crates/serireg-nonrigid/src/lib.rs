//! Non-rigid registrar (C6) and micro-registrar (C7): dense displacement
//! solving bounded to a tissue-union mask, with serial-compose and
//! align-to-reference strategies, optional tiled high-resolution
//! refinement, and the `.srdf` spill format for large displacement fields.

pub mod compose;
pub mod error;
pub mod field;
pub mod mask;
pub mod micro;
pub mod solver;
pub mod spill;

pub use compose::{align_to_reference, serial_compose, NonRigidOutcome};
pub use error::{OutOfMemory, SolverFailed};
pub use field::PairedFields;
pub use mask::{crop_to_bbox, nr_bbox};
pub use micro::{apply_micro_update, check_memory_budget, estimate_memory_bytes, stitch_tiles, tile_grid};
pub use solver::{ConstantShiftSolver, IdentitySolver, NonRigidSolver};
pub use spill::{read_srdf, write_srdf};
