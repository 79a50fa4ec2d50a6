/// Errors raised by the batch deduplication orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The proposed plan violates an invariant. Aborts the job before any
    /// mutation; the job transitions to Failed.
    #[error("plan validation failed: {}", errors.join("; "))]
    Validation { errors: Vec<String> },

    #[error("batch job not found: {job_id}")]
    JobNotFound { job_id: String },

    #[error("batch job {job_id} was cancelled after {completed_actions} actions")]
    Cancelled {
        job_id: String,
        completed_actions: usize,
    },

    #[error("agent not found: {agent_id}")]
    AgentNotFound { agent_id: String },
}
