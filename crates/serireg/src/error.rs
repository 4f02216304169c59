//! Orchestrator-level error/warning plumbing (§7/§10.1): stage functions
//! return `(output, warnings)` instead of a bare `Result`, so a non-fatal
//! per-pair solver failure can surface without aborting the whole run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Warning {
    #[error(transparent)]
    SolverFailed(#[from] serireg_nonrigid::SolverFailed),
    #[error(transparent)]
    OutOfMemory(#[from] serireg_nonrigid::OutOfMemory),
}

/// Everything that went fatally wrong during a run, surfaced together
/// rather than aborting at the first error.
#[derive(Debug, Error)]
#[error("registration failed with {} fatal error(s)", errors.len())]
pub struct Report {
    pub errors: Vec<anyhow::Error>,
}

pub type TotalResult<T> = Result<(T, Vec<Warning>), Report>;
