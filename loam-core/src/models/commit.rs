use serde::{Deserialize, Serialize};

use crate::knowledge::{KnowledgeContent, KnowledgeType};
use crate::models::MergeStrategy;

/// CRUD operation requested against a knowledge store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

/// Targeted partial substitution for Refine. The caller supplies only the
/// changed fragment plus enough context to locate it; everything else in the
/// existing content is preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Refinement {
    /// Replace the first occurrence of `locate` in a preference body.
    Text { locate: String, replacement: String },
    /// Replace the action of the clause whose condition equals `condition`.
    Clause { condition: String, action: String },
    /// Replace the text of the step located by label or text fragment.
    Step { locate: String, replacement: String },
}

/// One commit against the safe-mutation core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRequest {
    pub knowledge_type: KnowledgeType,
    pub operation: Operation,
    pub strategy: MergeStrategy,
    /// Existing item id for Update/Delete; None for Create.
    pub knowledge_id: Option<String>,
    /// Item name; used for creations and history records.
    pub name: Option<String>,
    /// Full or to-be-merged content. None for Delete and pure refinements.
    pub content: Option<KnowledgeContent>,
    /// Fragment for Refine.
    pub refinement: Option<Refinement>,
    pub agent_id: String,
    pub tenant_id: Option<String>,
    /// Free-text feedback that originated this commit.
    pub feedback: Option<String>,
    /// Set when the commit was produced by a batch job.
    pub batch_job_id: Option<String>,
}

/// What actually happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// Item written; id of the affected item.
    Committed { id: String },
    /// Duplicate content; nothing written.
    Skipped,
    /// Conflicting knowledge; nothing written, resolution left to the caller.
    ConflictEscalated { target_id: Option<String> },
}

/// Result of a commit, including the final content for committed writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitResult {
    pub outcome: CommitOutcome,
    pub knowledge_type: KnowledgeType,
    pub operation: Operation,
    /// The content as persisted (post-merge), when a write happened.
    pub committed_content: Option<KnowledgeContent>,
}

impl CommitResult {
    pub fn committed_id(&self) -> Option<&str> {
        match &self.outcome {
            CommitOutcome::Committed { id } => Some(id),
            _ => None,
        }
    }
}
