use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;

/// Queue state of a feedback task.
///
/// Pending -> Claimed -> Done | Failed. A Claimed task can return to Pending
/// only through stale-claim reclamation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Claimed,
    Done,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Claimed => "claimed",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "claimed" => Ok(TaskStatus::Claimed),
            "done" => Ok(TaskStatus::Done),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(StorageError::InvalidColumn {
                column: "status".into(),
                value: other.into(),
            }),
        }
    }
}

/// One unit of pending feedback waiting to be turned into knowledge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackTask {
    pub id: String,
    pub agent_id: String,
    pub tenant_id: Option<String>,
    /// Raw feedback text handed to the classification oracle.
    pub feedback: String,
    /// Optional human-readable context around the feedback.
    pub description: Option<String>,
    pub status: TaskStatus,
    /// Identity of the worker that claimed this task.
    pub consumer: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Failure message for Failed tasks.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
