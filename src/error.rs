use thiserror::Error;

/// Errors raised by the simulation core.
#[derive(Debug, Error)]
pub enum SimError {
    /// Grid access outside `width x height`. Unreachable with correct partitioning.
    #[error("cell ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfRange {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    /// RNG asked for an empty range. Indicates a configuration bug.
    #[error("invalid random range: min {min} > max {max}")]
    InvalidRange { min: i64, max: i64 },

    /// A partition's scan did not complete; the whole tick was discarded.
    #[error("worker {worker} failed: {reason}")]
    WorkerFailure { worker: usize, reason: String },

    #[error("cannot build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
