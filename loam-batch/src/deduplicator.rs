//! The batch deduplication orchestrator: collect -> plan -> validate ->
//! execute, one agent at a time, with a pre-mutation backup for every
//! destructive action.
//!
//! Dry runs go through the identical collect/plan/validate path and stop
//! there; they write nothing but the job row itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use loam_core::config::BatchConfig;
use loam_core::errors::{BatchError, LoamError, LoamResult};
use loam_core::knowledge::{KnowledgeContent, KnowledgeItem, KnowledgeType};
use loam_core::models::{
    AgentBatchResult, BackupOperation, BackupRecord, BatchJob, BatchJobStatus, DedupAction,
    DedupPlan, HistoryRecord, KnowledgeOperation, RegistryEntry,
};
use loam_core::traits::SimilarityOracle;
use loam_merge::StoreSet;
use loam_storage::StorageEngine;

use crate::{convert, planner, validator};

/// What to run over.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Restrict to one agent; None means every agent in the registry.
    pub agent_id: Option<String>,
    pub tenant_id: Option<String>,
    pub dry_run: bool,
}

pub struct Deduplicator {
    ledger: Arc<StorageEngine>,
    stores: Arc<StoreSet>,
    oracle: Arc<dyn SimilarityOracle>,
    config: BatchConfig,
}

impl Deduplicator {
    pub fn new(
        ledger: Arc<StorageEngine>,
        stores: Arc<StoreSet>,
        oracle: Arc<dyn SimilarityOracle>,
        config: BatchConfig,
    ) -> Self {
        Self { ledger, stores, oracle, config }
    }

    /// Execute one batch job. Returns the final job row; the same row is
    /// persisted whatever the outcome.
    pub fn run(&self, options: &RunOptions, cancel: &AtomicBool) -> LoamResult<BatchJob> {
        let mut job = BatchJob {
            job_id: BatchJob::generate_id(Utc::now()),
            agent_id: options.agent_id.clone(),
            tenant_id: options.tenant_id.clone(),
            status: BatchJobStatus::Running,
            dry_run: options.dry_run,
            total_agents: 0,
            processed_agents: 0,
            total_deleted: 0,
            total_moved: 0,
            total_kept: 0,
            total_errors: 0,
            summary: None,
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        self.ledger.insert_job(&job)?;
        tracing::info!(job_id = %job.job_id, dry_run = job.dry_run, "batch job started");

        match self.run_inner(&mut job, options, cancel) {
            Ok(results) => {
                job.status = BatchJobStatus::Completed;
                job.summary = Some(serde_json::to_value(&results)?);
                job.completed_at = Some(Utc::now());
                self.ledger.update_job(&job)?;
                tracing::info!(
                    job_id = %job.job_id,
                    deleted = job.total_deleted,
                    moved = job.total_moved,
                    kept = job.total_kept,
                    "batch job completed"
                );
                Ok(job)
            }
            Err(e) => {
                job.status = BatchJobStatus::Failed;
                job.error_message = Some(e.to_string());
                job.completed_at = Some(Utc::now());
                self.ledger.update_job(&job)?;
                tracing::error!(job_id = %job.job_id, error = %e, "batch job failed");
                Err(e)
            }
        }
    }

    fn run_inner(
        &self,
        job: &mut BatchJob,
        options: &RunOptions,
        cancel: &AtomicBool,
    ) -> LoamResult<Vec<AgentBatchResult>> {
        let agents = self.resolve_agents(options)?;
        job.total_agents = agents.len() as u32;
        self.ledger.update_job(job)?;

        let mut results = Vec::with_capacity(agents.len());
        let mut completed_actions = 0usize;

        for agent_id in agents {
            self.check_cancel(job, cancel, completed_actions)?;

            let items = self.collect_items(&agent_id)?;
            let plan = planner::plan_agent(&agent_id, items, self.oracle.as_ref())?;
            validator::validate(&plan, &self.config)?;

            let result = if job.dry_run {
                AgentBatchResult {
                    agent_id: agent_id.clone(),
                    deleted: plan.summary.deleted,
                    moved: plan.summary.moved,
                    kept: plan.summary.kept,
                    ..Default::default()
                }
            } else {
                self.execute_plan(job, &plan, cancel, &mut completed_actions)?
            };

            job.total_deleted += result.deleted;
            job.total_moved += result.moved;
            job.total_kept += result.kept;
            job.total_errors += result.errors.len() as u32;
            job.processed_agents += 1;
            self.ledger.update_job(job)?;
            results.push(result);
        }
        Ok(results)
    }

    fn resolve_agents(&self, options: &RunOptions) -> LoamResult<Vec<String>> {
        match &options.agent_id {
            Some(agent_id) => {
                let known = !self.collect_items(agent_id)?.is_empty()
                    || !self.ledger.registry_for_agent(agent_id)?.is_empty();
                if !known {
                    return Err(LoamError::Batch(BatchError::AgentNotFound {
                        agent_id: agent_id.clone(),
                    }));
                }
                Ok(vec![agent_id.clone()])
            }
            None => self.ledger.list_agents(),
        }
    }

    fn collect_items(&self, agent_id: &str) -> LoamResult<Vec<KnowledgeItem>> {
        let mut items = Vec::new();
        for knowledge_type in KnowledgeType::ALL {
            items.extend(self.stores.get(knowledge_type).list(agent_id)?);
        }
        Ok(items)
    }

    fn check_cancel(
        &self,
        job: &BatchJob,
        cancel: &AtomicBool,
        completed_actions: usize,
    ) -> LoamResult<()> {
        if cancel.load(Ordering::SeqCst) {
            return Err(LoamError::Batch(BatchError::Cancelled {
                job_id: job.job_id.clone(),
                completed_actions,
            }));
        }
        Ok(())
    }

    /// Execute one agent's plan. Item failures are recorded and skipped;
    /// only cancellation aborts.
    fn execute_plan(
        &self,
        job: &BatchJob,
        plan: &DedupPlan,
        cancel: &AtomicBool,
        completed_actions: &mut usize,
    ) -> LoamResult<AgentBatchResult> {
        let mut result = AgentBatchResult { agent_id: plan.agent_id.clone(), ..Default::default() };

        for action in &plan.actions {
            self.check_cancel(job, cancel, *completed_actions)?;

            let outcome = match action {
                DedupAction::Keep { .. } => {
                    result.kept += 1;
                    Ok(())
                }
                DedupAction::Delete { storage_type, item_id, reason } => self
                    .execute_delete(job, &plan.agent_id, *storage_type, item_id, reason)
                    .map(|deleted| {
                        if deleted {
                            result.deleted += 1;
                        } else {
                            result.kept += 1;
                        }
                    }),
                DedupAction::Move { storage_type, item_id, to, content, reason } => self
                    .execute_move(job, &plan.agent_id, *storage_type, item_id, *to, content, reason)
                    .map(|moved| {
                        if moved {
                            result.moved += 1;
                        } else {
                            result.kept += 1;
                        }
                    }),
            };
            if let Err(e) = outcome {
                tracing::warn!(
                    job_id = %job.job_id,
                    agent_id = %plan.agent_id,
                    item_id = action.item_id(),
                    error = %e,
                    "batch action failed, continuing"
                );
                result.errors.push(format!("{}: {e}", action.item_id()));
            }
            *completed_actions += 1;
        }
        Ok(result)
    }

    /// Backup, delete, ledger, registry. Returns false when the item had
    /// already disappeared.
    fn execute_delete(
        &self,
        job: &BatchJob,
        agent_id: &str,
        storage_type: KnowledgeType,
        item_id: &str,
        reason: &str,
    ) -> LoamResult<bool> {
        let store = self.stores.get(storage_type);
        let Some(item) = store.read(agent_id, item_id)? else {
            return Ok(false);
        };

        self.ledger.insert_backup(&BackupRecord {
            job_id: job.job_id.clone(),
            agent_id: agent_id.to_string(),
            tenant_id: job.tenant_id.clone(),
            storage_type,
            item_id: item_id.to_string(),
            operation: BackupOperation::Delete,
            original_content: serde_json::to_value(&item)?,
            moved_to_storage: None,
            moved_to_id: None,
            created_at: Utc::now(),
        })?;

        store.delete(agent_id, item_id)?;
        self.append_history(job, &item, KnowledgeOperation::Delete, None, None, reason)?;
        self.ledger.remove_registry(agent_id, storage_type, item_id)?;
        Ok(true)
    }

    /// Backup, create in target, backfill the backup, delete the source.
    /// Returns false when the item had already disappeared.
    #[allow(clippy::too_many_arguments)]
    fn execute_move(
        &self,
        job: &BatchJob,
        agent_id: &str,
        storage_type: KnowledgeType,
        item_id: &str,
        to: KnowledgeType,
        oracle_content: &Option<KnowledgeContent>,
        reason: &str,
    ) -> LoamResult<bool> {
        let source = self.stores.get(storage_type);
        let Some(item) = source.read(agent_id, item_id)? else {
            return Ok(false);
        };

        let backup_rowid = self.ledger.insert_backup(&BackupRecord {
            job_id: job.job_id.clone(),
            agent_id: agent_id.to_string(),
            tenant_id: job.tenant_id.clone(),
            storage_type,
            item_id: item_id.to_string(),
            operation: BackupOperation::Move,
            original_content: serde_json::to_value(&item)?,
            moved_to_storage: Some(to),
            moved_to_id: None,
            created_at: Utc::now(),
        })?;

        let target_content = oracle_content
            .clone()
            .unwrap_or_else(|| convert::convert(&item.content, to));

        // Create-then-delete: a failure between the two leaves the source in
        // place and the backup without a target id.
        let target = self.stores.get(to);
        let new_id = target.create(agent_id, &item.name, &target_content)?;
        self.ledger.set_moved_to_id(backup_rowid, &new_id)?;
        source.delete(agent_id, item_id)?;

        self.append_history(
            job,
            &item,
            KnowledgeOperation::Move,
            Some((storage_type, to)),
            Some((&new_id, &target_content)),
            reason,
        )?;

        self.ledger.remove_registry(agent_id, storage_type, item_id)?;
        let now = Utc::now();
        self.ledger.upsert_registry(&RegistryEntry {
            agent_id: agent_id.to_string(),
            knowledge_type: to,
            knowledge_id: new_id,
            content_summary: target_content.summary(),
            content_hash: target_content.content_hash()?,
            updated_at: now,
            last_accessed_at: now,
        })?;
        Ok(true)
    }

    fn append_history(
        &self,
        job: &BatchJob,
        item: &KnowledgeItem,
        operation: KnowledgeOperation,
        moved: Option<(KnowledgeType, KnowledgeType)>,
        new: Option<(&str, &KnowledgeContent)>,
        reason: &str,
    ) -> LoamResult<()> {
        self.ledger.append_history(&HistoryRecord {
            seq: 0,
            knowledge_type: item.knowledge_type,
            knowledge_id: item.id.clone(),
            knowledge_name: Some(item.name.clone()),
            agent_id: item.agent_id.clone(),
            tenant_id: job.tenant_id.clone(),
            operation,
            previous_content: Some(serde_json::to_value(&item.content)?),
            new_content: new
                .map(|(id, content)| {
                    serde_json::to_value(content).map(|value| {
                        serde_json::json!({ "id": id, "content": value })
                    })
                })
                .transpose()?,
            moved_from_type: moved.map(|(from, _)| from),
            moved_to_type: moved.map(|(_, to)| to),
            feedback_content: Some(reason.to_string()),
            batch_job_id: Some(job.job_id.clone()),
            created_at: Utc::now(),
        })?;
        Ok(())
    }

    /// Scheduler loop: run a job every `interval_secs` until shutdown.
    pub async fn run_on_interval(self: Arc<Self>, options: RunOptions, shutdown: Arc<AtomicBool>) {
        if !self.config.enabled {
            tracing::info!("batch scheduler disabled");
            return;
        }
        let interval = Duration::from_secs(self.config.interval_secs);
        while !shutdown.load(Ordering::SeqCst) {
            tokio::time::sleep(interval).await;
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            let opts = RunOptions { dry_run: self.config.dry_run, ..options.clone() };
            if let Err(e) = self.run(&opts, &shutdown) {
                tracing::error!(error = %e, "scheduled batch run failed");
            }
        }
    }
}
