//! # loam-merge
//!
//! Turning classified feedback into knowledge mutations: per-type merge
//! executors (extend, refine, replace), the safe-mutation committer that
//! writes history on every mutation, and the feedback worker pipeline that
//! drains the task queue.

pub mod committer;
pub mod executors;
pub mod pipeline;

pub use committer::{Committer, StoreSet};
pub use pipeline::FeedbackWorker;
