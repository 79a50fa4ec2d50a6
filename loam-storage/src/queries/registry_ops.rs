//! Knowledge registry: denormalized index of live items.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use loam_core::errors::LoamResult;
use loam_core::knowledge::KnowledgeType;
use loam_core::models::RegistryEntry;

use super::{fmt_ts, parse_ts};
use crate::to_storage_err;

/// Insert or refresh a registry entry. Last write wins.
pub fn upsert(conn: &Connection, entry: &RegistryEntry) -> LoamResult<()> {
    conn.execute(
        "INSERT INTO knowledge_registry (
            agent_id, knowledge_type, knowledge_id, content_summary,
            content_hash, updated_at, last_accessed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (agent_id, knowledge_type, knowledge_id) DO UPDATE SET
            content_summary = excluded.content_summary,
            content_hash = excluded.content_hash,
            updated_at = excluded.updated_at,
            last_accessed_at = excluded.last_accessed_at",
        params![
            entry.agent_id,
            entry.knowledge_type.as_str(),
            entry.knowledge_id,
            entry.content_summary,
            entry.content_hash,
            fmt_ts(entry.updated_at),
            fmt_ts(entry.last_accessed_at),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Remove an entry. Removing a missing entry is not an error.
pub fn remove(
    conn: &Connection,
    agent_id: &str,
    knowledge_type: KnowledgeType,
    knowledge_id: &str,
) -> LoamResult<bool> {
    let rows = conn
        .execute(
            "DELETE FROM knowledge_registry
             WHERE agent_id = ?1 AND knowledge_type = ?2 AND knowledge_id = ?3",
            params![agent_id, knowledge_type.as_str(), knowledge_id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}

/// Fetch one entry.
pub fn get(
    conn: &Connection,
    agent_id: &str,
    knowledge_type: KnowledgeType,
    knowledge_id: &str,
) -> LoamResult<Option<RegistryEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT agent_id, knowledge_type, knowledge_id, content_summary,
                    content_hash, updated_at, last_accessed_at
             FROM knowledge_registry
             WHERE agent_id = ?1 AND knowledge_type = ?2 AND knowledge_id = ?3",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let result = stmt
        .query_row(
            params![agent_id, knowledge_type.as_str(), knowledge_id],
            row_to_entry,
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    result.transpose()
}

/// All entries for one agent.
pub fn for_agent(conn: &Connection, agent_id: &str) -> LoamResult<Vec<RegistryEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT agent_id, knowledge_type, knowledge_id, content_summary,
                    content_hash, updated_at, last_accessed_at
             FROM knowledge_registry WHERE agent_id = ?1
             ORDER BY knowledge_type, knowledge_id",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows = stmt
        .query_map(params![agent_id], row_to_entry)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter().collect()
}

/// Distinct agents present in the registry.
pub fn list_agents(conn: &Connection) -> LoamResult<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT agent_id FROM knowledge_registry ORDER BY agent_id")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows)
}

/// Bump last_accessed_at on an entry.
pub fn touch(
    conn: &Connection,
    agent_id: &str,
    knowledge_type: KnowledgeType,
    knowledge_id: &str,
    now: DateTime<Utc>,
) -> LoamResult<()> {
    conn.execute(
        "UPDATE knowledge_registry SET last_accessed_at = ?4
         WHERE agent_id = ?1 AND knowledge_type = ?2 AND knowledge_id = ?3",
        params![agent_id, knowledge_type.as_str(), knowledge_id, fmt_ts(now)],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<LoamResult<RegistryEntry>> {
    let agent_id: String = row.get(0)?;
    let knowledge_type: String = row.get(1)?;
    let knowledge_id: String = row.get(2)?;
    let content_summary: String = row.get(3)?;
    let content_hash: String = row.get(4)?;
    let updated_at: String = row.get(5)?;
    let last_accessed_at: String = row.get(6)?;

    Ok((|| {
        Ok(RegistryEntry {
            agent_id,
            knowledge_type: knowledge_type.parse()?,
            knowledge_id,
            content_summary,
            content_hash,
            updated_at: parse_ts(&updated_at)?,
            last_accessed_at: parse_ts(&last_accessed_at)?,
        })
    })())
}
