use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::knowledge::KnowledgeType;

/// Operation recorded in the audit ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KnowledgeOperation {
    Create,
    Update,
    Delete,
    /// Item re-homed to a different knowledge type by a batch job.
    Move,
    /// Item brought back by a rollback.
    Restore,
}

impl KnowledgeOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeOperation::Create => "CREATE",
            KnowledgeOperation::Update => "UPDATE",
            KnowledgeOperation::Delete => "DELETE",
            KnowledgeOperation::Move => "MOVE",
            KnowledgeOperation::Restore => "RESTORE",
        }
    }
}

/// Immutable audit entry. Append-only: never updated or deleted.
///
/// Written by every executor on every successful mutation, and on every
/// attempted mutation whose store write failed after the final content was
/// determined (new_content annotated with the failure).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Ledger-assigned sequence number; 0 before insertion.
    #[serde(default)]
    pub seq: i64,
    pub knowledge_type: KnowledgeType,
    pub knowledge_id: String,
    pub knowledge_name: Option<String>,
    pub agent_id: String,
    pub tenant_id: Option<String>,
    pub operation: KnowledgeOperation,
    pub previous_content: Option<serde_json::Value>,
    pub new_content: Option<serde_json::Value>,
    /// Move only.
    pub moved_from_type: Option<KnowledgeType>,
    /// Move only.
    pub moved_to_type: Option<KnowledgeType>,
    /// Free-text feedback that originated the mutation.
    pub feedback_content: Option<String>,
    /// Set when produced by a batch run.
    pub batch_job_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
