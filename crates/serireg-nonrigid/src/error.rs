//! C6/C7 failure taxonomy (§7): a solver failure on one pair is non-fatal
//! and falls back to identity displacement; running out of memory during
//! micro-registration promotes the rest of the run to tiled mode rather
//! than aborting.

#[derive(Debug, thiserror::Error)]
#[error("non-rigid solver failed for pair (moving={}, fixed={})", pair.0, pair.1)]
pub struct SolverFailed {
    pub pair: (usize, usize),
    #[source]
    pub source: anyhow::Error,
}

#[derive(Debug, thiserror::Error)]
#[error("estimated displacement memory ({estimated_bytes} bytes) exceeds the {threshold_bytes} byte threshold")]
pub struct OutOfMemory {
    pub estimated_bytes: u64,
    pub threshold_bytes: u64,
}
