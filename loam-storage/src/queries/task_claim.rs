//! Feedback task queue: enqueue, exactly-once claim, completion.
//!
//! Claiming runs a single UPDATE with a subselect and RETURNING on the sole
//! write connection. Because all writes are serialized through that
//! connection, two concurrent claimers can never select the same pending row.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use loam_core::errors::LoamResult;
use loam_core::models::{FeedbackTask, TaskStatus};

use super::{fmt_ts, parse_ts};
use crate::to_storage_err;

const TASK_COLUMNS: &str = "id, agent_id, tenant_id, feedback, description, status, \
     consumer, claimed_at, completed_at, error, created_at, updated_at";

/// Insert a new pending task.
pub fn enqueue(conn: &Connection, task: &FeedbackTask) -> LoamResult<()> {
    conn.execute(
        "INSERT INTO feedback_tasks (
            id, agent_id, tenant_id, feedback, description, status,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            task.id,
            task.agent_id,
            task.tenant_id,
            task.feedback,
            task.description,
            TaskStatus::Pending.as_str(),
            fmt_ts(task.created_at),
            fmt_ts(task.updated_at),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Atomically claim up to `limit` pending tasks for `consumer`.
///
/// Newest first (updated_at DESC, id as tie-break). Returns the claimed
/// tasks; an empty queue yields an empty vec, never an error.
pub fn claim(
    conn: &Connection,
    limit: u32,
    consumer: &str,
    now: DateTime<Utc>,
) -> LoamResult<Vec<FeedbackTask>> {
    let now_str = fmt_ts(now);
    let mut stmt = conn
        .prepare(&format!(
            "UPDATE feedback_tasks
             SET status = 'claimed', consumer = ?1, claimed_at = ?2, updated_at = ?2
             WHERE id IN (
                 SELECT id FROM feedback_tasks
                 WHERE status = 'pending'
                 ORDER BY updated_at DESC, id
                 LIMIT ?3
             )
             RETURNING {TASK_COLUMNS}"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows = stmt
        .query_map(params![consumer, now_str, limit], row_to_task)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    rows.into_iter().collect()
}

/// Mark a claimed task done.
pub fn complete(conn: &Connection, id: &str, now: DateTime<Utc>) -> LoamResult<bool> {
    let rows = conn
        .execute(
            "UPDATE feedback_tasks
             SET status = 'done', completed_at = ?2, updated_at = ?2, error = NULL
             WHERE id = ?1 AND status = 'claimed'",
            params![id, fmt_ts(now)],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}

/// Mark a claimed task failed, recording the error message.
pub fn fail(conn: &Connection, id: &str, error: &str, now: DateTime<Utc>) -> LoamResult<bool> {
    let rows = conn
        .execute(
            "UPDATE feedback_tasks
             SET status = 'failed', completed_at = ?2, updated_at = ?2, error = ?3
             WHERE id = ?1 AND status = 'claimed'",
            params![id, fmt_ts(now), error],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}

/// Return claimed tasks whose claim is older than `cutoff` to pending.
/// Covers workers that died mid-task. Returns the number reclaimed.
pub fn reclaim_stale(
    conn: &Connection,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> LoamResult<usize> {
    let rows = conn
        .execute(
            "UPDATE feedback_tasks
             SET status = 'pending', consumer = NULL, claimed_at = NULL, updated_at = ?2
             WHERE status = 'claimed' AND claimed_at < ?1",
            params![fmt_ts(cutoff), fmt_ts(now)],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows)
}

/// Fetch a single task by id.
pub fn get_task(conn: &Connection, id: &str) -> LoamResult<Option<FeedbackTask>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM feedback_tasks WHERE id = ?1"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let result = stmt
        .query_row(params![id], row_to_task)
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    result.transpose()
}

/// Count tasks by status.
pub fn count_by_status(conn: &Connection, status: TaskStatus) -> LoamResult<usize> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM feedback_tasks WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as usize)
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<LoamResult<FeedbackTask>> {
    let status_str: String = row.get(5)?;
    let claimed_at: Option<String> = row.get(7)?;
    let completed_at: Option<String> = row.get(8)?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;

    let task = FeedbackTask {
        id: row.get(0)?,
        agent_id: row.get(1)?,
        tenant_id: row.get(2)?,
        feedback: row.get(3)?,
        description: row.get(4)?,
        status: TaskStatus::Pending,
        consumer: row.get(6)?,
        claimed_at: None,
        completed_at: None,
        error: row.get(9)?,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    Ok(finish_task(task, status_str, claimed_at, completed_at, created_at, updated_at))
}

fn finish_task(
    mut task: FeedbackTask,
    status: String,
    claimed_at: Option<String>,
    completed_at: Option<String>,
    created_at: String,
    updated_at: String,
) -> LoamResult<FeedbackTask> {
    task.status = status.parse()?;
    task.claimed_at = claimed_at.as_deref().map(parse_ts).transpose()?;
    task.completed_at = completed_at.as_deref().map(parse_ts).transpose()?;
    task.created_at = parse_ts(&created_at)?;
    task.updated_at = parse_ts(&updated_at)?;
    Ok(task)
}
