//! Result and record models shared across the workspace.

pub mod backup;
pub mod batch_job;
pub mod classification;
pub mod commit;
pub mod dedup;
pub mod history;
pub mod registry;
pub mod rollback;
pub mod task;

pub use backup::{BackupOperation, BackupRecord};
pub use batch_job::{AgentBatchResult, BatchJob, BatchJobStatus};
pub use classification::{Classification, MergeStrategy, Relationship};
pub use commit::{CommitOutcome, CommitRequest, CommitResult, Operation, Refinement};
pub use dedup::{DedupAction, DedupPlan, PlanSummary, SimilarityJudgment, SuggestedAction};
pub use history::{HistoryRecord, KnowledgeOperation};
pub use registry::RegistryEntry;
pub use rollback::{ItemRollback, RollbackResult};
pub use task::{FeedbackTask, TaskStatus};
