//! Error types for all Loam subsystems.
//!
//! Each subsystem gets its own thiserror enum; `LoamError` is the umbrella
//! that crosses crate boundaries.

mod batch_error;
mod merge_error;
mod oracle_error;
mod rollback_error;
mod storage_error;

pub use batch_error::BatchError;
pub use merge_error::MergeError;
pub use oracle_error::OracleError;
pub use rollback_error::RollbackError;
pub use storage_error::StorageError;

/// Umbrella error for the whole workspace.
#[derive(Debug, thiserror::Error)]
pub enum LoamError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Rollback(#[from] RollbackError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type LoamResult<T> = Result<T, LoamError>;
