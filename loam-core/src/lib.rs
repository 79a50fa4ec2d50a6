//! # loam-core
//!
//! Foundation crate for the Loam knowledge system.
//! Defines all types, traits, errors, and config.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod decision;
pub mod errors;
pub mod knowledge;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::{BatchConfig, CommitterConfig, LoamConfig, ProcedureAuthoring, WorkerConfig};
pub use decision::merge_strategy;
pub use errors::{LoamError, LoamResult};
pub use knowledge::{KnowledgeContent, KnowledgeItem, KnowledgeType};
pub use models::{
    BatchJob, BatchJobStatus, Classification, CommitResult, HistoryRecord, KnowledgeOperation,
    MergeStrategy, Relationship,
};
