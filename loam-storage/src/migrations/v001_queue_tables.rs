//! v001: feedback_tasks queue.

use rusqlite::Connection;

use loam_core::errors::LoamResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> LoamResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS feedback_tasks (
            id           TEXT PRIMARY KEY,
            agent_id     TEXT NOT NULL,
            tenant_id    TEXT,
            feedback     TEXT NOT NULL,
            description  TEXT,
            status       TEXT NOT NULL DEFAULT 'pending',
            consumer     TEXT,
            claimed_at   TEXT,
            completed_at TEXT,
            error        TEXT,
            created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            updated_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_status_updated
            ON feedback_tasks(status, updated_at DESC);
        CREATE INDEX IF NOT EXISTS idx_tasks_agent ON feedback_tasks(agent_id);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
