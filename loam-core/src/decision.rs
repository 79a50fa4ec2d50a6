//! Merge decision table: pure mapping from a classified relationship to the
//! strategy the executors apply. No side effects, no I/O.

use crate::models::{MergeStrategy, Relationship};

/// Map a relationship classification to a merge strategy.
///
/// Complements and Unrelated deliberately get a distinct `CreateNew` strategy
/// rather than an overloaded Replace: they create a fresh item and never
/// mutate the matched one. ConflictEscalate never writes.
pub fn merge_strategy(relationship: Relationship) -> MergeStrategy {
    match relationship {
        Relationship::Duplicate => MergeStrategy::NoOp,
        Relationship::Extends => MergeStrategy::Extend,
        Relationship::Refines => MergeStrategy::Refine,
        Relationship::Exception => MergeStrategy::Extend,
        Relationship::Supersedes => MergeStrategy::Replace,
        Relationship::Complements => MergeStrategy::CreateNew,
        Relationship::Unrelated => MergeStrategy::CreateNew,
        Relationship::Conflicts => MergeStrategy::ConflictEscalate,
    }
}
