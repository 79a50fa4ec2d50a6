//! The feedback worker: drains the task queue, asks the classification
//! oracle how each piece of feedback relates to what the agent knows, and
//! hands the resulting commit to the committer.
//!
//! A task failure (oracle down, merge error) marks the task failed and moves
//! on; it never takes the worker down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use loam_core::config::WorkerConfig;
use loam_core::decision::merge_strategy;
use loam_core::errors::LoamResult;
use loam_core::knowledge::{KnowledgeItem, KnowledgeType};
use loam_core::models::{
    Classification, CommitRequest, CommitResult, FeedbackTask, MergeStrategy, Operation,
};
use loam_core::traits::ClassificationOracle;
use loam_storage::StorageEngine;

use crate::committer::Committer;

pub struct FeedbackWorker {
    storage: Arc<StorageEngine>,
    committer: Arc<Committer>,
    classifier: Arc<dyn ClassificationOracle>,
    config: WorkerConfig,
}

impl FeedbackWorker {
    pub fn new(
        storage: Arc<StorageEngine>,
        committer: Arc<Committer>,
        classifier: Arc<dyn ClassificationOracle>,
        config: WorkerConfig,
    ) -> Self {
        Self { storage, committer, classifier, config }
    }

    /// Claim one batch of tasks and process each to completion. Returns the
    /// number of tasks processed (zero when the queue was empty).
    pub fn poll_once(&self) -> LoamResult<usize> {
        let tasks = self
            .storage
            .claim_tasks(self.config.claim_limit, &self.config.consumer)?;
        let count = tasks.len();

        for task in tasks {
            match self.process_task(&task) {
                Ok(result) => {
                    tracing::debug!(
                        task_id = %task.id,
                        outcome = ?result.outcome,
                        "task processed"
                    );
                    self.storage.complete_task(&task.id)?;
                }
                Err(e) => {
                    tracing::warn!(task_id = %task.id, error = %e, "task failed");
                    self.storage.fail_task(&task.id, &e.to_string())?;
                }
            }
        }
        Ok(count)
    }

    /// Poll until `shutdown` is set, sleeping between empty polls.
    pub async fn run(&self, shutdown: Arc<AtomicBool>) {
        let idle = Duration::from_secs(self.config.poll_interval_secs);
        while !shutdown.load(Ordering::SeqCst) {
            match self.poll_once() {
                Ok(0) => tokio::time::sleep(idle).await,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "worker poll failed");
                    tokio::time::sleep(idle).await;
                }
            }
        }
        tracing::info!(consumer = %self.config.consumer, "worker stopped");
    }

    fn process_task(&self, task: &FeedbackTask) -> LoamResult<CommitResult> {
        let candidates = self.candidates(&task.agent_id)?;
        let classification = self.classifier.classify(&task.feedback, &candidates)?;
        let request = build_request(task, classification);
        self.committer.commit(&request)
    }

    /// Everything the agent currently knows, across all three stores.
    fn candidates(&self, agent_id: &str) -> LoamResult<Vec<KnowledgeItem>> {
        let mut items = Vec::new();
        for knowledge_type in KnowledgeType::ALL {
            items.extend(self.committer.stores().get(knowledge_type).list(agent_id)?);
        }
        Ok(items)
    }
}

/// Translate a classification into a commit request via the decision table.
fn build_request(task: &FeedbackTask, classification: Classification) -> CommitRequest {
    let strategy = merge_strategy(classification.relationship);
    let operation = match strategy {
        MergeStrategy::CreateNew => Operation::Create,
        _ => Operation::Update,
    };
    CommitRequest {
        knowledge_type: classification.knowledge_type,
        operation,
        strategy,
        knowledge_id: classification.target_id,
        name: classification.name,
        content: classification.content,
        refinement: classification.refinement,
        agent_id: task.agent_id.clone(),
        tenant_id: task.tenant_id.clone(),
        feedback: Some(task.feedback.clone()),
        batch_job_id: None,
    }
}
