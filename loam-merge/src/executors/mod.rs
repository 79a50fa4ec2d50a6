//! Per-type merge executors. Pure functions over content: they never touch
//! storage, which keeps every merge law testable in isolation.
//!
//! Extend is idempotent by construction: merging content that is already
//! present returns `Merged::Unchanged`, so a retried task never duplicates
//! knowledge.

pub mod preference;
pub mod procedure;
pub mod rule;

use loam_core::errors::{LoamError, LoamResult, MergeError};
use loam_core::knowledge::KnowledgeContent;
use loam_core::models::Refinement;

/// Result of an extend or refine: the final content, or a marker that the
/// existing content already covers the incoming one.
#[derive(Debug, Clone, PartialEq)]
pub enum Merged {
    Changed(KnowledgeContent),
    Unchanged,
}

impl Merged {
    pub fn into_content(self, existing: &KnowledgeContent) -> KnowledgeContent {
        match self {
            Merged::Changed(content) => content,
            Merged::Unchanged => existing.clone(),
        }
    }
}

/// Extend `existing` with `incoming`, preserving everything already there.
pub fn extend(existing: &KnowledgeContent, incoming: &KnowledgeContent) -> LoamResult<Merged> {
    match (existing, incoming) {
        (KnowledgeContent::Preference(a), KnowledgeContent::Preference(b)) => {
            Ok(preference::extend(a, b))
        }
        (KnowledgeContent::Rule(a), KnowledgeContent::Rule(b)) => Ok(rule::extend(a, b)),
        (KnowledgeContent::Procedure(a), KnowledgeContent::Procedure(b)) => {
            Ok(procedure::extend(a, b))
        }
        (existing, incoming) => Err(mismatch(existing, incoming)),
    }
}

/// Apply a targeted refinement to `existing`.
pub fn refine(existing: &KnowledgeContent, refinement: &Refinement) -> LoamResult<Merged> {
    match (existing, refinement) {
        (KnowledgeContent::Preference(p), Refinement::Text { locate, replacement }) => {
            preference::refine(p, locate, replacement)
        }
        (KnowledgeContent::Rule(r), Refinement::Clause { condition, action }) => {
            rule::refine(r, condition, action)
        }
        (KnowledgeContent::Procedure(p), Refinement::Step { locate, replacement }) => {
            procedure::refine(p, locate, replacement)
        }
        (existing, _) => Err(LoamError::Merge(MergeError::RefinementMismatch {
            knowledge_type: content_type(existing),
        })),
    }
}

fn mismatch(existing: &KnowledgeContent, incoming: &KnowledgeContent) -> LoamError {
    LoamError::Merge(MergeError::ContentMismatch {
        expected: content_type(existing),
        got: type_name(incoming),
    })
}

fn content_type(content: &KnowledgeContent) -> loam_core::knowledge::KnowledgeType {
    match content {
        KnowledgeContent::Preference(_) => loam_core::knowledge::KnowledgeType::Preference,
        KnowledgeContent::Rule(_) => loam_core::knowledge::KnowledgeType::Rule,
        KnowledgeContent::Procedure(_) => loam_core::knowledge::KnowledgeType::Procedure,
    }
}

fn type_name(content: &KnowledgeContent) -> &'static str {
    content_type(content).as_str()
}
