//! Batch job and backup bookkeeping.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use loam_core::errors::LoamResult;
use loam_core::models::{BackupOperation, BackupRecord, BatchJob, BatchJobStatus};

use super::{fmt_ts, parse_ts};
use crate::to_storage_err;

const JOB_COLUMNS: &str = "job_id, agent_id, tenant_id, status, dry_run, total_agents, \
     processed_agents, total_deleted, total_moved, total_kept, total_errors, summary, \
     error_message, started_at, completed_at";

const BACKUP_COLUMNS: &str = "job_id, agent_id, tenant_id, storage_type, item_id, operation, \
     original_content, moved_to_storage, moved_to_id, created_at";

/// Insert a freshly started job.
pub fn insert_job(conn: &Connection, job: &BatchJob) -> LoamResult<()> {
    let summary = job.summary.as_ref().map(serde_json::to_string).transpose()?;
    conn.execute(
        &format!(
            "INSERT INTO batch_jobs ({JOB_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        ),
        params![
            job.job_id,
            job.agent_id,
            job.tenant_id,
            job.status.as_str(),
            job.dry_run as i32,
            job.total_agents,
            job.processed_agents,
            job.total_deleted,
            job.total_moved,
            job.total_kept,
            job.total_errors,
            summary,
            job.error_message,
            fmt_ts(job.started_at),
            job.completed_at.map(fmt_ts),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Overwrite the mutable fields of an existing job.
pub fn update_job(conn: &Connection, job: &BatchJob) -> LoamResult<()> {
    let summary = job.summary.as_ref().map(serde_json::to_string).transpose()?;
    let rows = conn
        .execute(
            "UPDATE batch_jobs SET
                status = ?2, total_agents = ?3, processed_agents = ?4,
                total_deleted = ?5, total_moved = ?6, total_kept = ?7,
                total_errors = ?8, summary = ?9, error_message = ?10,
                completed_at = ?11
             WHERE job_id = ?1",
            params![
                job.job_id,
                job.status.as_str(),
                job.total_agents,
                job.processed_agents,
                job.total_deleted,
                job.total_moved,
                job.total_kept,
                job.total_errors,
                summary,
                job.error_message,
                job.completed_at.map(fmt_ts),
            ],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    if rows == 0 {
        return Err(to_storage_err(format!("batch job not found: {}", job.job_id)));
    }
    Ok(())
}

/// Fetch one job.
pub fn get_job(conn: &Connection, job_id: &str) -> LoamResult<Option<BatchJob>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {JOB_COLUMNS} FROM batch_jobs WHERE job_id = ?1"))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let result = stmt
        .query_row(params![job_id], row_to_job)
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    result.transpose()
}

/// Recent jobs, newest first.
pub fn recent_jobs(conn: &Connection, limit: usize) -> LoamResult<Vec<BatchJob>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM batch_jobs ORDER BY started_at DESC LIMIT ?1"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![limit as i64], row_to_job)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter().collect()
}

/// Insert a pre-mutation backup. Returns its row id.
pub fn insert_backup(conn: &Connection, backup: &BackupRecord) -> LoamResult<i64> {
    conn.execute(
        &format!(
            "INSERT INTO batch_backups ({BACKUP_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ),
        params![
            backup.job_id,
            backup.agent_id,
            backup.tenant_id,
            backup.storage_type.as_str(),
            backup.item_id,
            backup.operation.as_str(),
            serde_json::to_string(&backup.original_content)?,
            backup.moved_to_storage.map(|t| t.as_str()),
            backup.moved_to_id,
            fmt_ts(backup.created_at),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(conn.last_insert_rowid())
}

/// Backfill the target id on a move backup once the target item exists.
pub fn set_moved_to_id(conn: &Connection, backup_rowid: i64, moved_to_id: &str) -> LoamResult<()> {
    conn.execute(
        "UPDATE batch_backups SET moved_to_id = ?2 WHERE id = ?1",
        params![backup_rowid, moved_to_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// All backups for a job, in insertion order.
pub fn backups_for_job(conn: &Connection, job_id: &str) -> LoamResult<Vec<BackupRecord>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {BACKUP_COLUMNS} FROM batch_backups WHERE job_id = ?1 ORDER BY id"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![job_id], row_to_backup)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter().collect()
}

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<LoamResult<BatchJob>> {
    let status: String = row.get(3)?;
    let summary: Option<String> = row.get(11)?;
    let started_at: String = row.get(13)?;
    let completed_at: Option<String> = row.get(14)?;

    let job_id: String = row.get(0)?;
    let agent_id: Option<String> = row.get(1)?;
    let tenant_id: Option<String> = row.get(2)?;
    let dry_run: i32 = row.get(4)?;
    let total_agents: u32 = row.get(5)?;
    let processed_agents: u32 = row.get(6)?;
    let total_deleted: u32 = row.get(7)?;
    let total_moved: u32 = row.get(8)?;
    let total_kept: u32 = row.get(9)?;
    let total_errors: u32 = row.get(10)?;
    let error_message: Option<String> = row.get(12)?;

    Ok((|| {
        Ok(BatchJob {
            job_id,
            agent_id,
            tenant_id,
            status: status.parse::<BatchJobStatus>()?,
            dry_run: dry_run != 0,
            total_agents,
            processed_agents,
            total_deleted,
            total_moved,
            total_kept,
            total_errors,
            summary: summary.as_deref().map(serde_json::from_str).transpose()?,
            error_message,
            started_at: parse_ts(&started_at)?,
            completed_at: completed_at.as_deref().map(parse_ts).transpose()?,
        })
    })())
}

fn row_to_backup(row: &rusqlite::Row<'_>) -> rusqlite::Result<LoamResult<BackupRecord>> {
    let storage_type: String = row.get(3)?;
    let operation: String = row.get(5)?;
    let original_content: String = row.get(6)?;
    let moved_to_storage: Option<String> = row.get(7)?;
    let created_at: String = row.get(9)?;

    let job_id: String = row.get(0)?;
    let agent_id: String = row.get(1)?;
    let tenant_id: Option<String> = row.get(2)?;
    let item_id: String = row.get(4)?;
    let moved_to_id: Option<String> = row.get(8)?;

    Ok((|| {
        Ok(BackupRecord {
            job_id,
            agent_id,
            tenant_id,
            storage_type: storage_type.parse()?,
            item_id,
            operation: operation.parse::<BackupOperation>()?,
            original_content: serde_json::from_str(&original_content)?,
            moved_to_storage: moved_to_storage.as_deref().map(str::parse).transpose()?,
            moved_to_id,
            created_at: parse_ts(&created_at)?,
        })
    })())
}
