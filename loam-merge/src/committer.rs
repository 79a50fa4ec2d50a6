//! The safe-mutation committer. Every knowledge write in the system funnels
//! through here: it resolves the merge strategy against the current store
//! state, writes the store, and appends a history record for every mutation.
//!
//! History is not optional: a failed history append fails the whole commit,
//! and a failed store write still leaves an annotated history record behind.

use std::sync::Arc;

use chrono::Utc;

use loam_core::config::{CommitterConfig, ProcedureAuthoring};
use loam_core::errors::{LoamError, LoamResult, MergeError};
use loam_core::knowledge::{KnowledgeContent, KnowledgeItem, KnowledgeType};
use loam_core::models::{
    CommitOutcome, CommitRequest, CommitResult, HistoryRecord, KnowledgeOperation, MergeStrategy,
    Operation, RegistryEntry,
};
use loam_core::traits::KnowledgeStore;
use loam_storage::StorageEngine;

use crate::executors::{self, Merged};

/// The three physical backends, one per knowledge type.
pub struct StoreSet {
    preference: Arc<dyn KnowledgeStore>,
    rule: Arc<dyn KnowledgeStore>,
    procedure: Arc<dyn KnowledgeStore>,
}

impl StoreSet {
    pub fn new(
        preference: Arc<dyn KnowledgeStore>,
        rule: Arc<dyn KnowledgeStore>,
        procedure: Arc<dyn KnowledgeStore>,
    ) -> Self {
        Self { preference, rule, procedure }
    }

    pub fn get(&self, knowledge_type: KnowledgeType) -> &Arc<dyn KnowledgeStore> {
        match knowledge_type {
            KnowledgeType::Preference => &self.preference,
            KnowledgeType::Rule => &self.rule,
            KnowledgeType::Procedure => &self.procedure,
        }
    }
}

pub struct Committer {
    stores: StoreSet,
    ledger: Arc<StorageEngine>,
    config: CommitterConfig,
}

impl Committer {
    pub fn new(stores: StoreSet, ledger: Arc<StorageEngine>, config: CommitterConfig) -> Self {
        Self { stores, ledger, config }
    }

    pub fn stores(&self) -> &StoreSet {
        &self.stores
    }

    /// Execute one commit. Returns what actually happened; duplicate or
    /// already-merged content comes back as `Skipped` without any write.
    pub fn commit(&self, request: &CommitRequest) -> LoamResult<CommitResult> {
        match request.strategy {
            MergeStrategy::NoOp => {
                tracing::debug!(
                    agent_id = %request.agent_id,
                    knowledge_type = %request.knowledge_type,
                    "duplicate feedback, skipping"
                );
                return Ok(self.result(request, CommitOutcome::Skipped, None));
            }
            MergeStrategy::ConflictEscalate => {
                tracing::warn!(
                    agent_id = %request.agent_id,
                    knowledge_type = %request.knowledge_type,
                    target_id = ?request.knowledge_id,
                    "conflicting knowledge, escalating without write"
                );
                return Ok(self.result(
                    request,
                    CommitOutcome::ConflictEscalated { target_id: request.knowledge_id.clone() },
                    None,
                ));
            }
            _ => {}
        }

        match request.operation {
            Operation::Delete => self.delete(request),
            Operation::Create => self.create(request),
            Operation::Update => match request.strategy {
                MergeStrategy::Replace => self.replace(request),
                MergeStrategy::Extend => self.extend(request),
                MergeStrategy::Refine => self.refine(request),
                MergeStrategy::CreateNew => self.create(request),
                MergeStrategy::NoOp | MergeStrategy::ConflictEscalate => unreachable!(),
            },
        }
    }

    fn create(&self, request: &CommitRequest) -> LoamResult<CommitResult> {
        let content = self.authored_content(request)?;
        let name = request
            .name
            .clone()
            .unwrap_or_else(|| content.summary());
        let store = self.stores.get(request.knowledge_type);

        let id = match store.create(&request.agent_id, &name, &content) {
            Ok(id) => id,
            Err(e) => {
                self.record_failure(request, KnowledgeOperation::Create, "", None, &content, &e);
                return Err(e);
            }
        };

        self.append_history(request, KnowledgeOperation::Create, &id, None, Some(&content))?;
        self.upsert_registry(request, &id, &content);
        tracing::info!(
            agent_id = %request.agent_id,
            knowledge_type = %request.knowledge_type,
            id = %id,
            "created knowledge item"
        );
        Ok(self.result(request, CommitOutcome::Committed { id }, Some(content)))
    }

    fn replace(&self, request: &CommitRequest) -> LoamResult<CommitResult> {
        let content = request.content.clone().ok_or(LoamError::Merge(
            MergeError::MissingContent { operation: "replace".to_string() },
        ))?;
        let (id, existing) = self.target(request)?;

        if existing.content == content {
            return Ok(self.result(request, CommitOutcome::Skipped, None));
        }
        self.write_update(request, &id, &existing, content)
    }

    fn extend(&self, request: &CommitRequest) -> LoamResult<CommitResult> {
        let incoming = request.content.clone().ok_or(LoamError::Merge(
            MergeError::MissingContent { operation: "extend".to_string() },
        ))?;
        let (id, existing) = self.target(request)?;

        match executors::extend(&existing.content, &incoming)? {
            Merged::Unchanged => {
                tracing::debug!(id = %id, "extend already applied, skipping");
                Ok(self.result(request, CommitOutcome::Skipped, None))
            }
            Merged::Changed(content) => self.write_update(request, &id, &existing, content),
        }
    }

    fn refine(&self, request: &CommitRequest) -> LoamResult<CommitResult> {
        let refinement = request.refinement.clone().ok_or(LoamError::Merge(
            MergeError::MissingContent { operation: "refine".to_string() },
        ))?;
        let (id, existing) = self.target(request)?;

        match executors::refine(&existing.content, &refinement)? {
            Merged::Unchanged => Ok(self.result(request, CommitOutcome::Skipped, None)),
            Merged::Changed(content) => self.write_update(request, &id, &existing, content),
        }
    }

    fn delete(&self, request: &CommitRequest) -> LoamResult<CommitResult> {
        let id = request.knowledge_id.clone().ok_or(LoamError::Merge(
            MergeError::MissingTargetId { knowledge_type: request.knowledge_type },
        ))?;
        let store = self.stores.get(request.knowledge_type);
        let existing = store.read(&request.agent_id, &id)?;

        let Some(existing) = existing else {
            // Deleting a missing item is a no-op, not an error.
            return Ok(self.result(request, CommitOutcome::Skipped, None));
        };

        if let Err(e) = store.delete(&request.agent_id, &id) {
            self.record_failure(
                request,
                KnowledgeOperation::Delete,
                &id,
                Some(&existing.content),
                &existing.content,
                &e,
            );
            return Err(e);
        }

        self.append_history(
            request,
            KnowledgeOperation::Delete,
            &id,
            Some(&existing.content),
            None,
        )?;
        if let Err(e) = self.ledger.remove_registry(&request.agent_id, request.knowledge_type, &id)
        {
            tracing::warn!(id = %id, error = %e, "registry removal failed");
        }
        Ok(self.result(request, CommitOutcome::Committed { id }, None))
    }

    /// Apply an already-merged content to the target item.
    fn write_update(
        &self,
        request: &CommitRequest,
        id: &str,
        existing: &KnowledgeItem,
        content: KnowledgeContent,
    ) -> LoamResult<CommitResult> {
        let store = self.stores.get(request.knowledge_type);
        if let Err(e) = store.update(&request.agent_id, id, &content) {
            self.record_failure(
                request,
                KnowledgeOperation::Update,
                id,
                Some(&existing.content),
                &content,
                &e,
            );
            return Err(e);
        }

        self.append_history(
            request,
            KnowledgeOperation::Update,
            id,
            Some(&existing.content),
            Some(&content),
        )?;
        self.upsert_registry(request, id, &content);
        tracing::info!(
            agent_id = %request.agent_id,
            knowledge_type = %request.knowledge_type,
            id = %id,
            strategy = ?request.strategy,
            "updated knowledge item"
        );
        Ok(self.result(
            request,
            CommitOutcome::Committed { id: id.to_string() },
            Some(content),
        ))
    }

    /// Resolve the target item for update strategies.
    fn target(&self, request: &CommitRequest) -> LoamResult<(String, KnowledgeItem)> {
        let id = request.knowledge_id.clone().ok_or(LoamError::Merge(
            MergeError::MissingTargetId { knowledge_type: request.knowledge_type },
        ))?;
        let store = self.stores.get(request.knowledge_type);
        let item = store.read(&request.agent_id, &id)?.ok_or(LoamError::Merge(
            MergeError::TargetNotFound { knowledge_type: request.knowledge_type, id: id.clone() },
        ))?;
        Ok((id, item))
    }

    /// Newly authored content, with attachments stripped under Basic
    /// procedure authoring.
    fn authored_content(&self, request: &CommitRequest) -> LoamResult<KnowledgeContent> {
        let content = request.content.clone().ok_or(LoamError::Merge(
            MergeError::MissingContent { operation: "create".to_string() },
        ))?;
        match (&content, self.config.procedure_authoring) {
            (KnowledgeContent::Procedure(p), ProcedureAuthoring::Basic)
                if !p.attachments.is_empty() =>
            {
                let mut stripped = p.clone();
                stripped.attachments.clear();
                Ok(KnowledgeContent::Procedure(stripped))
            }
            _ => Ok(content),
        }
    }

    fn append_history(
        &self,
        request: &CommitRequest,
        operation: KnowledgeOperation,
        id: &str,
        previous: Option<&KnowledgeContent>,
        new: Option<&KnowledgeContent>,
    ) -> LoamResult<()> {
        let record = HistoryRecord {
            seq: 0,
            knowledge_type: request.knowledge_type,
            knowledge_id: id.to_string(),
            knowledge_name: request.name.clone(),
            agent_id: request.agent_id.clone(),
            tenant_id: request.tenant_id.clone(),
            operation,
            previous_content: previous.map(serde_json::to_value).transpose()?,
            new_content: new.map(serde_json::to_value).transpose()?,
            moved_from_type: None,
            moved_to_type: None,
            feedback_content: request.feedback.clone(),
            batch_job_id: request.batch_job_id.clone(),
            created_at: Utc::now(),
        };
        self.ledger.append_history(&record)?;
        Ok(())
    }

    /// Store write failed after the final content was determined: leave an
    /// annotated record in the ledger before surfacing the error. The
    /// annotation itself is best-effort; its failure is logged and must never
    /// displace the store error the caller is about to receive.
    fn record_failure(
        &self,
        request: &CommitRequest,
        operation: KnowledgeOperation,
        id: &str,
        previous: Option<&KnowledgeContent>,
        intended: &KnowledgeContent,
        error: &LoamError,
    ) {
        tracing::warn!(
            agent_id = %request.agent_id,
            knowledge_type = %request.knowledge_type,
            id = %id,
            error = %error,
            "store write failed, recording annotated history"
        );
        let append = || -> LoamResult<()> {
            let record = HistoryRecord {
                seq: 0,
                knowledge_type: request.knowledge_type,
                knowledge_id: id.to_string(),
                knowledge_name: request.name.clone(),
                agent_id: request.agent_id.clone(),
                tenant_id: request.tenant_id.clone(),
                operation,
                previous_content: previous.map(serde_json::to_value).transpose()?,
                new_content: Some(serde_json::json!({
                    "not_applied": error.to_string(),
                    "content": serde_json::to_value(intended)?,
                })),
                moved_from_type: None,
                moved_to_type: None,
                feedback_content: request.feedback.clone(),
                batch_job_id: request.batch_job_id.clone(),
                created_at: Utc::now(),
            };
            self.ledger.append_history(&record)?;
            Ok(())
        };
        if let Err(audit) = append() {
            tracing::error!(id = %id, error = %audit, "annotated history write failed");
        }
    }

    /// Registry upkeep is best-effort: the registry is a derived index, and a
    /// failed upsert is repaired by the next successful write to the same key.
    fn upsert_registry(&self, request: &CommitRequest, id: &str, content: &KnowledgeContent) {
        let now = Utc::now();
        let outcome = content.content_hash().and_then(|hash| {
            self.ledger.upsert_registry(&RegistryEntry {
                agent_id: request.agent_id.clone(),
                knowledge_type: request.knowledge_type,
                knowledge_id: id.to_string(),
                content_summary: content.summary(),
                content_hash: hash,
                updated_at: now,
                last_accessed_at: now,
            })
        });
        if let Err(e) = outcome {
            tracing::warn!(id = %id, error = %e, "registry upsert failed");
        }
    }

    fn result(
        &self,
        request: &CommitRequest,
        outcome: CommitOutcome,
        committed_content: Option<KnowledgeContent>,
    ) -> CommitResult {
        CommitResult {
            outcome,
            knowledge_type: request.knowledge_type,
            operation: request.operation,
            committed_content,
        }
    }
}
