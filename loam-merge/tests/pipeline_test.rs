//! End-to-end worker tests: queue -> classification -> commit -> task state.

use std::sync::Arc;

use chrono::Utc;
use loam_core::config::{CommitterConfig, WorkerConfig};
use loam_core::knowledge::{KnowledgeContent, KnowledgeType};
use loam_core::models::{Classification, FeedbackTask, Relationship, TaskStatus};
use loam_merge::{Committer, FeedbackWorker, StoreSet};
use loam_storage::StorageEngine;
use test_fixtures::{builders, InMemoryStore, ScriptedClassifier};

fn worker_config() -> WorkerConfig {
    WorkerConfig {
        claim_limit: 10,
        poll_interval_secs: 1,
        consumer: "worker-test".to_string(),
    }
}

fn make_task(id: &str, feedback: &str) -> FeedbackTask {
    let now = Utc::now();
    FeedbackTask {
        id: id.to_string(),
        agent_id: "agent-1".to_string(),
        tenant_id: None,
        feedback: feedback.to_string(),
        description: None,
        status: TaskStatus::Pending,
        consumer: None,
        claimed_at: None,
        completed_at: None,
        error: None,
        created_at: now,
        updated_at: now,
    }
}

struct World {
    storage: Arc<StorageEngine>,
    preference: Arc<InMemoryStore>,
    rule: Arc<InMemoryStore>,
}

fn build_worker(answers: Vec<Classification>) -> (FeedbackWorker, World) {
    test_fixtures::init_test_logging();
    let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
    let preference = Arc::new(InMemoryStore::new(KnowledgeType::Preference));
    let rule = Arc::new(InMemoryStore::new(KnowledgeType::Rule));
    let procedure = Arc::new(InMemoryStore::new(KnowledgeType::Procedure));
    let committer = Arc::new(Committer::new(
        StoreSet::new(preference.clone(), rule.clone(), procedure),
        storage.clone(),
        CommitterConfig::default(),
    ));
    let worker = FeedbackWorker::new(
        storage.clone(),
        committer,
        Arc::new(ScriptedClassifier::new(answers)),
        worker_config(),
    );
    (worker, World { storage, preference, rule })
}

#[test]
fn new_feedback_lands_as_a_created_item() {
    let (worker, world) = build_worker(vec![Classification {
        relationship: Relationship::Unrelated,
        target_id: None,
        knowledge_type: KnowledgeType::Preference,
        content: Some(KnowledgeContent::preference("Answer in Italian.")),
        refinement: None,
        name: Some("language preference".to_string()),
    }]);

    world.storage.enqueue_task(&make_task("t-1", "please answer in Italian")).unwrap();
    assert_eq!(worker.poll_once().unwrap(), 1);

    assert_eq!(world.preference.len(), 1);
    let task = world.storage.get_task("t-1").unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Done);
}

#[test]
fn oracle_failure_marks_the_task_failed() {
    // Empty script: the first classify call errors.
    let (worker, world) = build_worker(vec![]);
    world.storage.enqueue_task(&make_task("t-1", "whatever")).unwrap();

    assert_eq!(worker.poll_once().unwrap(), 1);

    let task = world.storage.get_task("t-1").unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.error.as_deref().unwrap_or("").contains("script exhausted"));
    assert!(world.preference.is_empty());
}

#[test]
fn one_bad_task_does_not_poison_the_batch() {
    let (worker, world) = build_worker(vec![
        // First claimed task extends a rule that does not exist.
        Classification {
            relationship: Relationship::Extends,
            target_id: Some("rule-404".to_string()),
            knowledge_type: KnowledgeType::Rule,
            content: Some(KnowledgeContent::rule(vec![])),
            refinement: None,
            name: None,
        },
        // Second task is fine.
        Classification {
            relationship: Relationship::Unrelated,
            target_id: None,
            knowledge_type: KnowledgeType::Preference,
            content: Some(KnowledgeContent::preference("Use dark mode.")),
            refinement: None,
            name: None,
        },
    ]);

    // Claim order is newest-updated first; enqueue the failing one second so
    // it is claimed first.
    world.storage.enqueue_task(&make_task("t-good", "dark mode")).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    world.storage.enqueue_task(&make_task("t-bad", "extend missing rule")).unwrap();

    assert_eq!(worker.poll_once().unwrap(), 2);

    assert_eq!(world.storage.get_task("t-bad").unwrap().unwrap().status, TaskStatus::Failed);
    assert_eq!(world.storage.get_task("t-good").unwrap().unwrap().status, TaskStatus::Done);
    assert_eq!(world.preference.len(), 1);
}

#[test]
fn duplicate_feedback_completes_without_writes() {
    let (worker, world) = build_worker(vec![Classification {
        relationship: Relationship::Duplicate,
        target_id: Some("pref-1".to_string()),
        knowledge_type: KnowledgeType::Preference,
        content: None,
        refinement: None,
        name: None,
    }]);
    world.preference.seed(builders::preference_item("pref-1", "agent-1", "Use dark mode."));

    world.storage.enqueue_task(&make_task("t-1", "use dark mode please")).unwrap();
    assert_eq!(worker.poll_once().unwrap(), 1);

    assert_eq!(world.storage.get_task("t-1").unwrap().unwrap().status, TaskStatus::Done);
    assert_eq!(world.preference.len(), 1);
    assert!(world
        .storage
        .history_for_item(KnowledgeType::Preference, "pref-1", 10)
        .unwrap()
        .is_empty());
}

#[test]
fn conflicting_feedback_escalates_and_completes() {
    let (worker, world) = build_worker(vec![Classification {
        relationship: Relationship::Conflicts,
        target_id: Some("rule-1".to_string()),
        knowledge_type: KnowledgeType::Rule,
        content: Some(KnowledgeContent::rule(vec![])),
        refinement: None,
        name: None,
    }]);
    world.rule.seed(builders::rule_item("rule-1", "agent-1", &[("a", "x")]));

    world.storage.enqueue_task(&make_task("t-1", "actually never do x")).unwrap();
    assert_eq!(worker.poll_once().unwrap(), 1);

    // Escalation is a successful outcome for the task itself.
    assert_eq!(world.storage.get_task("t-1").unwrap().unwrap().status, TaskStatus::Done);
    assert!(world
        .storage
        .history_for_item(KnowledgeType::Rule, "rule-1", 10)
        .unwrap()
        .is_empty());
}
