//! Append-only history ledger. Records are inserted and read, never updated
//! or deleted.

use rusqlite::{params, Connection};

use loam_core::errors::LoamResult;
use loam_core::knowledge::KnowledgeType;
use loam_core::models::{HistoryRecord, KnowledgeOperation};

use super::{fmt_ts, parse_ts};
use crate::to_storage_err;

const HISTORY_COLUMNS: &str = "seq, knowledge_type, knowledge_id, knowledge_name, agent_id, \
     tenant_id, operation, previous_content, new_content, moved_from_type, moved_to_type, \
     feedback_content, batch_job_id, created_at";

/// Append one record and return its ledger sequence number.
pub fn append(conn: &Connection, record: &HistoryRecord) -> LoamResult<i64> {
    let previous = record
        .previous_content
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let new = record
        .new_content
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO knowledge_history (
            knowledge_type, knowledge_id, knowledge_name, agent_id, tenant_id,
            operation, previous_content, new_content, moved_from_type,
            moved_to_type, feedback_content, batch_job_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            record.knowledge_type.as_str(),
            record.knowledge_id,
            record.knowledge_name,
            record.agent_id,
            record.tenant_id,
            record.operation.as_str(),
            previous,
            new,
            record.moved_from_type.map(|t| t.as_str()),
            record.moved_to_type.map(|t| t.as_str()),
            record.feedback_content,
            record.batch_job_id,
            fmt_ts(record.created_at),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(conn.last_insert_rowid())
}

/// All records for one item, newest first.
pub fn for_item(
    conn: &Connection,
    knowledge_type: KnowledgeType,
    knowledge_id: &str,
    limit: usize,
) -> LoamResult<Vec<HistoryRecord>> {
    query_records(
        conn,
        &format!(
            "SELECT {HISTORY_COLUMNS} FROM knowledge_history
             WHERE knowledge_type = ?1 AND knowledge_id = ?2
             ORDER BY seq DESC LIMIT ?3"
        ),
        params![knowledge_type.as_str(), knowledge_id, limit as i64],
    )
}

/// All records written by one batch job, in insertion order.
pub fn for_job(conn: &Connection, job_id: &str) -> LoamResult<Vec<HistoryRecord>> {
    query_records(
        conn,
        &format!(
            "SELECT {HISTORY_COLUMNS} FROM knowledge_history
             WHERE batch_job_id = ?1 ORDER BY seq"
        ),
        params![job_id],
    )
}

/// All records for one agent, newest first.
pub fn for_agent(conn: &Connection, agent_id: &str, limit: usize) -> LoamResult<Vec<HistoryRecord>> {
    query_records(
        conn,
        &format!(
            "SELECT {HISTORY_COLUMNS} FROM knowledge_history
             WHERE agent_id = ?1 ORDER BY seq DESC LIMIT ?2"
        ),
        params![agent_id, limit as i64],
    )
}

fn query_records(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> LoamResult<Vec<HistoryRecord>> {
    let mut stmt = conn.prepare(sql).map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params, row_to_record)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter().collect()
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<LoamResult<HistoryRecord>> {
    let seq: i64 = row.get(0)?;
    let knowledge_type: String = row.get(1)?;
    let knowledge_id: String = row.get(2)?;
    let knowledge_name: Option<String> = row.get(3)?;
    let agent_id: String = row.get(4)?;
    let tenant_id: Option<String> = row.get(5)?;
    let operation: String = row.get(6)?;
    let previous: Option<String> = row.get(7)?;
    let new: Option<String> = row.get(8)?;
    let moved_from: Option<String> = row.get(9)?;
    let moved_to: Option<String> = row.get(10)?;
    let feedback_content: Option<String> = row.get(11)?;
    let batch_job_id: Option<String> = row.get(12)?;
    let created_at: String = row.get(13)?;

    Ok((|| {
        Ok(HistoryRecord {
            seq,
            knowledge_type: knowledge_type.parse()?,
            knowledge_id,
            knowledge_name,
            agent_id,
            tenant_id,
            operation: parse_operation(&operation)?,
            previous_content: previous.as_deref().map(serde_json::from_str).transpose()?,
            new_content: new.as_deref().map(serde_json::from_str).transpose()?,
            moved_from_type: moved_from.as_deref().map(str::parse).transpose()?,
            moved_to_type: moved_to.as_deref().map(str::parse).transpose()?,
            feedback_content,
            batch_job_id,
            created_at: parse_ts(&created_at)?,
        })
    })())
}

fn parse_operation(s: &str) -> LoamResult<KnowledgeOperation> {
    match s {
        "CREATE" => Ok(KnowledgeOperation::Create),
        "UPDATE" => Ok(KnowledgeOperation::Update),
        "DELETE" => Ok(KnowledgeOperation::Delete),
        "MOVE" => Ok(KnowledgeOperation::Move),
        "RESTORE" => Ok(KnowledgeOperation::Restore),
        other => Err(to_storage_err(format!("unknown operation '{other}'"))),
    }
}
