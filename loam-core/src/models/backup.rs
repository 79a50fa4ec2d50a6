use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;
use crate::knowledge::KnowledgeType;

/// Destructive action a backup record protects against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackupOperation {
    Delete,
    Move,
}

impl BackupOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupOperation::Delete => "DELETE",
            BackupOperation::Move => "MOVE",
        }
    }
}

impl fmt::Display for BackupOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupOperation {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DELETE" => Ok(BackupOperation::Delete),
            "MOVE" => Ok(BackupOperation::Move),
            other => Err(StorageError::InvalidColumn {
                column: "operation".into(),
                value: other.into(),
            }),
        }
    }
}

/// Full pre-mutation snapshot, written before any destructive batch action.
///
/// `original_content` holds the complete serialized item, sufficient to
/// recreate it verbatim during rollback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub job_id: String,
    pub agent_id: String,
    pub tenant_id: Option<String>,
    pub storage_type: KnowledgeType,
    pub item_id: String,
    pub operation: BackupOperation,
    pub original_content: serde_json::Value,
    /// Move only: where the item went.
    pub moved_to_storage: Option<KnowledgeType>,
    /// Move only: id assigned in the target store, backfilled after creation.
    pub moved_to_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
