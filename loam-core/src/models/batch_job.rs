use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;

/// Batch job lifecycle. Created Running; transitions exactly once to a
/// terminal status. RolledBack is reachable only from Completed and only when
/// `dry_run = false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchJobStatus {
    Running,
    Completed,
    Failed,
    RolledBack,
}

impl BatchJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchJobStatus::Running => "RUNNING",
            BatchJobStatus::Completed => "COMPLETED",
            BatchJobStatus::Failed => "FAILED",
            BatchJobStatus::RolledBack => "ROLLED_BACK",
        }
    }
}

impl fmt::Display for BatchJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchJobStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(BatchJobStatus::Running),
            "COMPLETED" => Ok(BatchJobStatus::Completed),
            "FAILED" => Ok(BatchJobStatus::Failed),
            "ROLLED_BACK" => Ok(BatchJobStatus::RolledBack),
            other => Err(StorageError::InvalidColumn {
                column: "status".into(),
                value: other.into(),
            }),
        }
    }
}

/// Per-agent outcome inside a batch job summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentBatchResult {
    pub agent_id: String,
    pub skipped: bool,
    pub skip_reason: Option<String>,
    pub deleted: u32,
    pub moved: u32,
    pub kept: u32,
    pub errors: Vec<String>,
}

/// One execution of the deduplication orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    /// Globally unique, time-derived: `batch_<YYYYmmdd_HHMMSS>_<uuid8>`.
    pub job_id: String,
    /// None means "all agents".
    pub agent_id: Option<String>,
    pub tenant_id: Option<String>,
    pub status: BatchJobStatus,
    /// Immutable after creation.
    pub dry_run: bool,
    pub total_agents: u32,
    pub processed_agents: u32,
    pub total_deleted: u32,
    pub total_moved: u32,
    pub total_kept: u32,
    pub total_errors: u32,
    /// Structured result (per-agent results, decision sets).
    pub summary: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchJob {
    /// Generate a time-derived job id.
    pub fn generate_id(now: DateTime<Utc>) -> String {
        let stamp = now.format("%Y%m%d_%H%M%S");
        let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];
        format!("batch_{stamp}_{suffix}")
    }
}
