//! Rollback of a completed batch job from its pre-mutation backups.
//!
//! Only completed, non-dry-run jobs with backups can be rolled back.
//! Backups replay in reverse insertion order, best-effort per item: one
//! failed restore never aborts the rest.

use chrono::Utc;

use loam_core::errors::{LoamError, LoamResult, RollbackError};
use loam_core::knowledge::KnowledgeItem;
use loam_core::models::{
    BackupOperation, BackupRecord, BatchJobStatus, HistoryRecord, ItemRollback,
    KnowledgeOperation, RegistryEntry, RollbackResult,
};
use loam_merge::StoreSet;
use loam_storage::StorageEngine;

/// Undo every destructive action of `job_id` and mark the job rolled back.
pub fn roll_back_job(
    ledger: &StorageEngine,
    stores: &StoreSet,
    job_id: &str,
) -> LoamResult<RollbackResult> {
    let mut job = ledger
        .get_job(job_id)?
        .ok_or_else(|| RollbackError::JobNotFound { job_id: job_id.to_string() })?;

    if job.dry_run {
        return Err(LoamError::Rollback(RollbackError::DryRunJob {
            job_id: job_id.to_string(),
        }));
    }
    match job.status {
        BatchJobStatus::Completed => {}
        BatchJobStatus::RolledBack => {
            return Err(LoamError::Rollback(RollbackError::AlreadyRolledBack {
                job_id: job_id.to_string(),
            }));
        }
        status => {
            return Err(LoamError::Rollback(RollbackError::NotCompleted {
                job_id: job_id.to_string(),
                status: status.as_str().to_string(),
            }));
        }
    }

    let backups = ledger.backups_for_job(job_id)?;
    if backups.is_empty() {
        return Err(LoamError::Rollback(RollbackError::NoBackups {
            job_id: job_id.to_string(),
        }));
    }

    let mut result = RollbackResult {
        job_id: job_id.to_string(),
        restored: 0,
        failures: Vec::new(),
        partial: false,
    };

    for backup in backups.iter().rev() {
        match restore_one(ledger, stores, backup) {
            Ok(()) => result.restored += 1,
            Err(e) => {
                tracing::warn!(
                    job_id,
                    item_id = %backup.item_id,
                    operation = %backup.operation,
                    error = %e,
                    "item rollback failed, continuing"
                );
                result.failures.push(ItemRollback {
                    storage_type: backup.storage_type,
                    item_id: backup.item_id.clone(),
                    operation: backup.operation,
                    restored: false,
                    error: Some(e.to_string()),
                });
            }
        }
    }
    result.partial = !result.failures.is_empty();

    job.status = BatchJobStatus::RolledBack;
    job.completed_at = Some(Utc::now());
    ledger.update_job(&job)?;
    tracing::info!(
        job_id,
        restored = result.restored,
        failures = result.failures.len(),
        "batch job rolled back"
    );
    Ok(result)
}

fn restore_one(
    ledger: &StorageEngine,
    stores: &StoreSet,
    backup: &BackupRecord,
) -> LoamResult<()> {
    let item: KnowledgeItem = serde_json::from_value(backup.original_content.clone())?;

    // For a move, first take back the item the job created in the target
    // store. Missing target entries are tolerated.
    if backup.operation == BackupOperation::Move {
        if let (Some(to), Some(moved_to_id)) = (backup.moved_to_storage, &backup.moved_to_id) {
            stores.get(to).delete(&backup.agent_id, moved_to_id)?;
            ledger.remove_registry(&backup.agent_id, to, moved_to_id)?;
        }
    }

    stores.get(backup.storage_type).restore(&item)?;

    ledger.append_history(&HistoryRecord {
        seq: 0,
        knowledge_type: item.knowledge_type,
        knowledge_id: item.id.clone(),
        knowledge_name: Some(item.name.clone()),
        agent_id: item.agent_id.clone(),
        tenant_id: backup.tenant_id.clone(),
        operation: KnowledgeOperation::Restore,
        previous_content: None,
        new_content: Some(serde_json::to_value(&item.content)?),
        moved_from_type: None,
        moved_to_type: None,
        feedback_content: Some(format!("rollback of {}", backup.job_id)),
        batch_job_id: Some(backup.job_id.clone()),
        created_at: Utc::now(),
    })?;

    let now = Utc::now();
    ledger.upsert_registry(&RegistryEntry {
        agent_id: item.agent_id.clone(),
        knowledge_type: item.knowledge_type,
        knowledge_id: item.id.clone(),
        content_summary: item.content.summary(),
        content_hash: item.content.content_hash()?,
        updated_at: now,
        last_accessed_at: now,
    })?;
    Ok(())
}
