//! Error types for memory benchmarks.

/// Everything that can stop a single benchmark from running.
///
/// Degraded topology discovery is not represented here: it falls back to the
/// heuristic classifier with a logged warning instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BenchError {
    #[error("failed to allocate {bytes} bytes of aligned memory")]
    AllocationFailure { bytes: usize },

    #[error("{total_bytes} bytes hold fewer than 2 lines of {line_size} bytes")]
    InsufficientSize { total_bytes: usize, line_size: usize },

    #[error("line size {line_size} must be a multiple of the word size and larger than one word")]
    InvalidLineSize { line_size: usize },

    #[error("requested {total_bytes} bytes but the buffer only holds {len}")]
    BufferTooShort { total_bytes: usize, len: usize },

    #[error("buffer is not aligned to the machine word")]
    MisalignedBuffer,

    #[error("latency measurement needs at least one access")]
    ZeroAccesses,
}

/// Convenience type alias.
pub type BenchResult<T> = Result<T, BenchError>;
