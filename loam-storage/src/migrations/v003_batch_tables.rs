//! v003: batch_jobs, batch_backups.

use rusqlite::Connection;

use loam_core::errors::LoamResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> LoamResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS batch_jobs (
            job_id           TEXT PRIMARY KEY,
            agent_id         TEXT,
            tenant_id        TEXT,
            status           TEXT NOT NULL DEFAULT 'RUNNING',
            dry_run          INTEGER NOT NULL DEFAULT 0,
            total_agents     INTEGER NOT NULL DEFAULT 0,
            processed_agents INTEGER NOT NULL DEFAULT 0,
            total_deleted    INTEGER NOT NULL DEFAULT 0,
            total_moved      INTEGER NOT NULL DEFAULT 0,
            total_kept       INTEGER NOT NULL DEFAULT 0,
            total_errors     INTEGER NOT NULL DEFAULT 0,
            summary          TEXT,
            error_message    TEXT,
            started_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            completed_at     TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_jobs_status ON batch_jobs(status);

        CREATE TABLE IF NOT EXISTS batch_backups (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id           TEXT NOT NULL,
            agent_id         TEXT NOT NULL,
            tenant_id        TEXT,
            storage_type     TEXT NOT NULL,
            item_id          TEXT NOT NULL,
            operation        TEXT NOT NULL,
            original_content TEXT NOT NULL,
            moved_to_storage TEXT,
            moved_to_id      TEXT,
            created_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_backups_job ON batch_backups(job_id);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
