//! # loam-batch
//!
//! Periodic knowledge hygiene: the deduplicator walks every agent's items,
//! asks the similarity oracle which pairs overlap, plans keep/delete/move
//! actions, validates the plan, and executes it with a pre-mutation backup
//! for every destructive action. Completed jobs can be rolled back.

pub mod convert;
pub mod deduplicator;
pub mod planner;
pub mod rollback;
pub mod validator;

pub use deduplicator::{Deduplicator, RunOptions};
pub use rollback::roll_back_job;
