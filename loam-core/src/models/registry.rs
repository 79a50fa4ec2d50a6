use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::knowledge::KnowledgeType;

/// Denormalized current-state index entry, keyed by
/// `(agent_id, knowledge_type, knowledge_id)`.
///
/// Exists for O(1) existence and change-detection checks without touching the
/// heavyweight store. One entry per live item; removed when the item is
/// deleted or moved away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub agent_id: String,
    pub knowledge_type: KnowledgeType,
    pub knowledge_id: String,
    pub content_summary: String,
    pub content_hash: String,
    pub updated_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}
