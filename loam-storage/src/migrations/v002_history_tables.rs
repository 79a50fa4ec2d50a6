//! v002: knowledge_history ledger, knowledge_registry index.

use rusqlite::Connection;

use loam_core::errors::LoamResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> LoamResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS knowledge_history (
            seq              INTEGER PRIMARY KEY AUTOINCREMENT,
            knowledge_type   TEXT NOT NULL,
            knowledge_id     TEXT NOT NULL,
            knowledge_name   TEXT,
            agent_id         TEXT NOT NULL,
            tenant_id        TEXT,
            operation        TEXT NOT NULL,
            previous_content TEXT,
            new_content      TEXT,
            moved_from_type  TEXT,
            moved_to_type    TEXT,
            feedback_content TEXT,
            batch_job_id     TEXT,
            created_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_history_item
            ON knowledge_history(knowledge_type, knowledge_id);
        CREATE INDEX IF NOT EXISTS idx_history_agent ON knowledge_history(agent_id);
        CREATE INDEX IF NOT EXISTS idx_history_batch ON knowledge_history(batch_job_id);

        CREATE TABLE IF NOT EXISTS knowledge_registry (
            agent_id         TEXT NOT NULL,
            knowledge_type   TEXT NOT NULL,
            knowledge_id     TEXT NOT NULL,
            content_summary  TEXT NOT NULL,
            content_hash     TEXT NOT NULL,
            updated_at       TEXT NOT NULL,
            last_accessed_at TEXT NOT NULL,
            PRIMARY KEY (agent_id, knowledge_type, knowledge_id)
        );

        CREATE INDEX IF NOT EXISTS idx_registry_agent ON knowledge_registry(agent_id);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
