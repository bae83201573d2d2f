//! Error types for the size pool

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("no enough item in size pool")]
    Exhausted,

    #[error("size pool is closed")]
    Closed,

    #[error("size pool is at maximum capacity")]
    Full,

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("returned item failed validation and was discarded")]
    ValidationFailed,

    #[error("operation was cancelled")]
    Cancelled,

    #[cfg(feature = "metrics")]
    #[error("metrics export failed: {0}")]
    MetricsExport(String),
}

pub type PoolResult<T> = Result<T, PoolError>;
