use serde::{Deserialize, Serialize};

use crate::knowledge::KnowledgeType;
use crate::models::backup::BackupOperation;

/// Outcome of restoring one backed-up item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRollback {
    pub storage_type: KnowledgeType,
    pub item_id: String,
    pub operation: BackupOperation,
    pub restored: bool,
    pub error: Option<String>,
}

/// Result of rolling back a completed batch job.
///
/// Rollback is best-effort per item: one failed restore never aborts the
/// rest. `partial` is true when any item failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackResult {
    pub job_id: String,
    pub restored: u32,
    pub failures: Vec<ItemRollback>,
    pub partial: bool,
}
