/// Rollback precondition failures. Each is rejected synchronously with no
/// partial attempt.
#[derive(Debug, thiserror::Error)]
pub enum RollbackError {
    #[error("batch job not found: {job_id}")]
    JobNotFound { job_id: String },

    #[error("job {job_id} was a dry run; no backups exist to restore")]
    DryRunJob { job_id: String },

    #[error("job {job_id} has already been rolled back")]
    AlreadyRolledBack { job_id: String },

    #[error("job {job_id} has no backup records")]
    NoBackups { job_id: String },

    #[error("job {job_id} is {status}; only completed jobs can be rolled back")]
    NotCompleted { job_id: String, status: String },
}
