use serde::{Deserialize, Serialize};

use crate::knowledge::{KnowledgeContent, KnowledgeType};

/// How a proposed piece of knowledge relates to an existing matched item,
/// as judged by the external classification oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relationship {
    /// Same content, only the wording differs.
    Duplicate,
    /// Adds a new case or condition without displacing the old.
    Extends,
    /// Changes a detail of the existing item.
    Refines,
    /// Exception clause for an existing rule; base rule retained.
    Exception,
    /// Contradicts the existing item; cannot be resolved mechanically.
    Conflicts,
    /// Explicit full replacement intended.
    Supersedes,
    /// Related but independent aspect.
    Complements,
    /// No relation at all.
    Unrelated,
}

/// What the merge layer does with a classified change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeStrategy {
    /// Content already represented; nothing is written.
    NoOp,
    /// Structurally merge the addition into the existing item.
    Extend,
    /// Targeted partial substitution inside the existing item.
    Refine,
    /// Caller-supplied content becomes the complete final state.
    Replace,
    /// Independent item; create it, never touch the match.
    CreateNew,
    /// Irreconcilable; surfaced to the caller, no automatic write.
    ConflictEscalate,
}

/// Output of the classification oracle for one feedback item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub relationship: Relationship,
    /// The matched existing item, when the relationship implies one.
    pub target_id: Option<String>,
    pub knowledge_type: KnowledgeType,
    /// Final content for merge operations; a fragment for refinements is
    /// carried separately in the commit request.
    pub content: Option<KnowledgeContent>,
    /// Refinement fragment when relationship = Refines.
    pub refinement: Option<super::commit::Refinement>,
    /// Proposed item name for creations.
    pub name: Option<String>,
}
