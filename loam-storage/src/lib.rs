//! # loam-storage
//!
//! SQLite persistence for the Loam system: the feedback task queue, the
//! append-only history ledger, the knowledge registry, and batch job
//! bookkeeping (jobs + backups). Single write connection behind a mutex,
//! round-robin read pool, schema migrations at startup.

pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;

pub use engine::StorageEngine;

use loam_core::errors::{LoamError, StorageError};

/// Convert any error message into a storage error.
pub(crate) fn to_storage_err(message: impl Into<String>) -> LoamError {
    LoamError::Storage(StorageError::Sqlite { message: message.into() })
}
