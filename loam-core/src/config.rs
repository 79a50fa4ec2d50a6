//! Runtime configuration for the workers and the batch scheduler.
//! All fields have sensible defaults; a fully default config is usable.

use serde::{Deserialize, Serialize};

/// How procedure content is authored on Create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcedureAuthoring {
    /// Keep structured steps and attachments as authored.
    Advanced,
    /// Strip attachments from newly authored procedures.
    Basic,
}

/// Feedback worker loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Maximum tasks claimed per poll.
    pub claim_limit: u32,
    /// Seconds between empty-queue polls.
    pub poll_interval_secs: u64,
    /// Stable identity recorded on every claim.
    pub consumer: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            claim_limit: 10,
            poll_interval_secs: 5,
            consumer: format!("worker-{}", uuid::Uuid::new_v4().simple()),
        }
    }
}

/// Commit behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitterConfig {
    pub procedure_authoring: ProcedureAuthoring,
}

impl Default for CommitterConfig {
    fn default() -> Self {
        Self { procedure_authoring: ProcedureAuthoring::Advanced }
    }
}

/// Batch deduplication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Whether the interval scheduler runs at all.
    pub enabled: bool,
    /// Seconds between scheduled runs.
    pub interval_secs: u64,
    /// Default dry-run flag for scheduled runs.
    pub dry_run: bool,
    /// Hard cap: a plan above this many destructive actions aborts.
    pub max_destructive_actions: u32,
    /// Soft cap: a plan above this many destructive actions logs a warning.
    pub warn_destructive_actions: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 24 * 60 * 60,
            dry_run: true,
            max_destructive_actions: 200,
            warn_destructive_actions: 100,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoamConfig {
    pub worker: WorkerConfig,
    pub committer: CommitterConfig,
    pub batch: BatchConfig,
}
