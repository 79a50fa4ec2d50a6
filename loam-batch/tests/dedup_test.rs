//! End-to-end deduplication runs against in-memory stores and ledger.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use loam_batch::{Deduplicator, RunOptions};
use loam_core::config::BatchConfig;
use loam_core::errors::{BatchError, LoamError};
use loam_core::knowledge::{KnowledgeContent, KnowledgeType};
use loam_core::models::{
    BackupOperation, BatchJobStatus, KnowledgeOperation, SimilarityJudgment, SuggestedAction,
};
use loam_core::traits::{KnowledgeStore, SimilarityOracle};
use loam_merge::StoreSet;
use loam_storage::StorageEngine;
use test_fixtures::{init_test_logging, preference_item, InMemoryStore, PairSimilarity};

struct Harness {
    ledger: Arc<StorageEngine>,
    preference: Arc<InMemoryStore>,
    rule: Arc<InMemoryStore>,
    procedure: Arc<InMemoryStore>,
}

impl Harness {
    fn new() -> Self {
        init_test_logging();
        Self {
            ledger: Arc::new(StorageEngine::open_in_memory().unwrap()),
            preference: Arc::new(InMemoryStore::new(KnowledgeType::Preference)),
            rule: Arc::new(InMemoryStore::new(KnowledgeType::Rule)),
            procedure: Arc::new(InMemoryStore::new(KnowledgeType::Procedure)),
        }
    }

    fn deduplicator(&self, oracle: impl SimilarityOracle + 'static, config: BatchConfig) -> Deduplicator {
        let stores = Arc::new(StoreSet::new(
            self.preference.clone() as Arc<dyn KnowledgeStore>,
            self.rule.clone() as Arc<dyn KnowledgeStore>,
            self.procedure.clone() as Arc<dyn KnowledgeStore>,
        ));
        Deduplicator::new(self.ledger.clone(), stores, Arc::new(oracle), config)
    }
}

fn agent_run(dry_run: bool) -> RunOptions {
    RunOptions { agent_id: Some("agent-1".to_string()), tenant_id: None, dry_run }
}

fn delete_judgment(score: f64) -> SimilarityJudgment {
    SimilarityJudgment { redundant: true, score, suggested: SuggestedAction::Delete }
}

#[test]
fn duplicate_preference_is_deleted_with_backup() {
    let h = Harness::new();
    h.preference.seed(preference_item("p-a", "agent-1", "always answer in English"));
    h.preference.seed(preference_item("p-b", "agent-1", "reply in English please"));

    let oracle = PairSimilarity::new().judge("p-a", "p-b", delete_judgment(0.93));
    let dedup = h.deduplicator(oracle, BatchConfig::default());

    let job = dedup.run(&agent_run(false), &AtomicBool::new(false)).unwrap();
    assert_eq!(job.status, BatchJobStatus::Completed);
    assert_eq!(job.total_deleted, 1);
    assert_eq!(job.total_kept, 1);
    assert_eq!(job.total_errors, 0);

    assert!(h.preference.read("agent-1", "p-a").unwrap().is_some());
    assert!(h.preference.read("agent-1", "p-b").unwrap().is_none());

    let backups = h.ledger.backups_for_job(&job.job_id).unwrap();
    assert_eq!(backups.len(), 1);
    assert_eq!(backups[0].item_id, "p-b");
    assert_eq!(backups[0].operation, BackupOperation::Delete);

    let history = h.ledger.history_for_job(&job.job_id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].operation, KnowledgeOperation::Delete);
    assert_eq!(history[0].knowledge_id, "p-b");
    assert_eq!(history[0].batch_job_id.as_deref(), Some(job.job_id.as_str()));
}

#[test]
fn move_converts_content_and_backfills_the_backup() {
    let h = Harness::new();
    h.preference.seed(preference_item("p-a", "agent-1", "unrelated"));
    h.preference.seed(preference_item(
        "p-b",
        "agent-1",
        "invoice is overdue\nsend a reminder email",
    ));

    let oracle = PairSimilarity::new().judge(
        "p-a",
        "p-b",
        SimilarityJudgment {
            redundant: true,
            score: 0.81,
            suggested: SuggestedAction::Move { to: KnowledgeType::Rule, content: None },
        },
    );
    let dedup = h.deduplicator(oracle, BatchConfig::default());

    let job = dedup.run(&agent_run(false), &AtomicBool::new(false)).unwrap();
    assert_eq!(job.status, BatchJobStatus::Completed);
    assert_eq!(job.total_moved, 1);

    assert!(h.preference.read("agent-1", "p-b").unwrap().is_none());
    assert_eq!(h.rule.len(), 1);
    let moved = h.rule.list("agent-1").unwrap().remove(0);
    let KnowledgeContent::Rule(rule) = &moved.content else { panic!("expected rule content") };
    assert_eq!(rule.clauses[0].condition, "invoice is overdue");
    assert_eq!(rule.clauses[0].action, "send a reminder email");

    let backups = h.ledger.backups_for_job(&job.job_id).unwrap();
    assert_eq!(backups.len(), 1);
    assert_eq!(backups[0].operation, BackupOperation::Move);
    assert_eq!(backups[0].moved_to_storage, Some(KnowledgeType::Rule));
    assert_eq!(backups[0].moved_to_id.as_deref(), Some(moved.id.as_str()));

    let history = h.ledger.history_for_job(&job.job_id).unwrap();
    assert_eq!(history[0].operation, KnowledgeOperation::Move);
    assert_eq!(history[0].moved_from_type, Some(KnowledgeType::Preference));
    assert_eq!(history[0].moved_to_type, Some(KnowledgeType::Rule));

    let entry = h
        .ledger
        .get_registry("agent-1", KnowledgeType::Rule, &moved.id)
        .unwrap()
        .unwrap();
    assert_eq!(entry.content_hash, moved.content.content_hash().unwrap());
}

#[test]
fn dry_run_counts_without_touching_anything() {
    let h = Harness::new();
    h.preference.seed(preference_item("p-a", "agent-1", "one"));
    h.preference.seed(preference_item("p-b", "agent-1", "one again"));

    let oracle = PairSimilarity::new().judge("p-a", "p-b", delete_judgment(0.99));
    let dedup = h.deduplicator(oracle, BatchConfig::default());

    let job = dedup.run(&agent_run(true), &AtomicBool::new(false)).unwrap();
    assert_eq!(job.status, BatchJobStatus::Completed);
    assert!(job.dry_run);
    assert_eq!(job.total_deleted, 1);
    assert_eq!(job.total_kept, 1);

    assert_eq!(h.preference.len(), 2);
    assert!(h.ledger.backups_for_job(&job.job_id).unwrap().is_empty());
    assert!(h.ledger.history_for_job(&job.job_id).unwrap().is_empty());
}

#[test]
fn repeated_dry_runs_report_the_same_plan() {
    let h = Harness::new();
    h.preference.seed(preference_item("p-a", "agent-1", "one"));
    h.preference.seed(preference_item("p-b", "agent-1", "one again"));
    h.preference.seed(preference_item("p-c", "agent-1", "different"));

    let oracle = PairSimilarity::new().judge("p-a", "p-b", delete_judgment(0.99));
    let dedup = h.deduplicator(oracle, BatchConfig::default());

    let first = dedup.run(&agent_run(true), &AtomicBool::new(false)).unwrap();
    let second = dedup.run(&agent_run(true), &AtomicBool::new(false)).unwrap();
    assert_eq!(first.total_deleted, second.total_deleted);
    assert_eq!(first.total_kept, second.total_kept);
    assert_eq!(first.total_moved, second.total_moved);
}

#[test]
fn plan_over_the_hard_cap_fails_the_job_before_any_mutation() {
    let h = Harness::new();
    h.preference.seed(preference_item("p-a", "agent-1", "anchor"));
    h.preference.seed(preference_item("p-b", "agent-1", "dup one"));
    h.preference.seed(preference_item("p-c", "agent-1", "dup two"));

    let oracle = PairSimilarity::new()
        .judge("p-a", "p-b", delete_judgment(0.9))
        .judge("p-a", "p-c", delete_judgment(0.9));
    let config = BatchConfig {
        max_destructive_actions: 1,
        warn_destructive_actions: 1,
        ..BatchConfig::default()
    };
    let dedup = h.deduplicator(oracle, config);

    let err = dedup.run(&agent_run(false), &AtomicBool::new(false)).unwrap_err();
    assert!(matches!(err, LoamError::Batch(BatchError::Validation { .. })));

    // Nothing was touched and the job row records the failure.
    assert_eq!(h.preference.len(), 3);
    let jobs = h.ledger.recent_jobs(10).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, BatchJobStatus::Failed);
    assert!(jobs[0].error_message.is_some());
    assert!(h.ledger.backups_for_job(&jobs[0].job_id).unwrap().is_empty());
}

#[test]
fn unknown_agent_fails_the_job() {
    let h = Harness::new();
    let dedup = h.deduplicator(PairSimilarity::new(), BatchConfig::default());

    let options =
        RunOptions { agent_id: Some("ghost".to_string()), tenant_id: None, dry_run: false };
    let err = dedup.run(&options, &AtomicBool::new(false)).unwrap_err();
    assert!(matches!(err, LoamError::Batch(BatchError::AgentNotFound { .. })));

    let jobs = h.ledger.recent_jobs(10).unwrap();
    assert_eq!(jobs[0].status, BatchJobStatus::Failed);
}

#[test]
fn cancellation_stops_the_run_and_fails_the_job() {
    let h = Harness::new();
    h.preference.seed(preference_item("p-a", "agent-1", "one"));
    h.preference.seed(preference_item("p-b", "agent-1", "one again"));

    let oracle = PairSimilarity::new().judge("p-a", "p-b", delete_judgment(0.95));
    let dedup = h.deduplicator(oracle, BatchConfig::default());

    let cancel = AtomicBool::new(true);
    let err = dedup.run(&agent_run(false), &cancel).unwrap_err();
    let LoamError::Batch(BatchError::Cancelled { completed_actions, .. }) = err else {
        panic!("expected cancellation, got {err}");
    };
    assert_eq!(completed_actions, 0);

    assert_eq!(h.preference.len(), 2);
    let jobs = h.ledger.recent_jobs(10).unwrap();
    assert_eq!(jobs[0].status, BatchJobStatus::Failed);
}

#[test]
fn failed_store_write_is_recorded_and_the_run_continues() {
    let h = Harness::new();
    h.preference.seed(preference_item("p-a", "agent-1", "anchor"));
    h.preference.seed(preference_item("p-b", "agent-1", "dup"));
    h.preference.set_fail_writes(true);

    let oracle = PairSimilarity::new().judge("p-a", "p-b", delete_judgment(0.9));
    let dedup = h.deduplicator(oracle, BatchConfig::default());

    let job = dedup.run(&agent_run(false), &AtomicBool::new(false)).unwrap();
    assert_eq!(job.status, BatchJobStatus::Completed);
    assert_eq!(job.total_deleted, 0);
    assert_eq!(job.total_errors, 1);
    assert_eq!(h.preference.len(), 2);
}
