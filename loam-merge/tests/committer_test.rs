//! Integration tests for the committer: strategy semantics, history on every
//! mutation, annotated history on store failure.

use std::sync::Arc;

use loam_core::config::{CommitterConfig, ProcedureAuthoring};
use loam_core::errors::{LoamError, StorageError};
use loam_core::knowledge::{KnowledgeContent, KnowledgeType, ProcedureContent, ProcedureStep, RuleClause};
use loam_core::models::{CommitOutcome, CommitRequest, KnowledgeOperation, MergeStrategy, Operation};
use loam_core::traits::KnowledgeStore;
use loam_merge::{Committer, StoreSet};
use loam_storage::StorageEngine;
use test_fixtures::{builders, InMemoryStore};

struct Harness {
    committer: Committer,
    ledger: Arc<StorageEngine>,
    preference: Arc<InMemoryStore>,
    rule: Arc<InMemoryStore>,
    procedure: Arc<InMemoryStore>,
}

fn harness() -> Harness {
    harness_with(CommitterConfig::default())
}

fn harness_with(config: CommitterConfig) -> Harness {
    test_fixtures::init_test_logging();
    let ledger = Arc::new(StorageEngine::open_in_memory().unwrap());
    let preference = Arc::new(InMemoryStore::new(KnowledgeType::Preference));
    let rule = Arc::new(InMemoryStore::new(KnowledgeType::Rule));
    let procedure = Arc::new(InMemoryStore::new(KnowledgeType::Procedure));
    let committer = Committer::new(
        StoreSet::new(preference.clone(), rule.clone(), procedure.clone()),
        ledger.clone(),
        config,
    );
    Harness { committer, ledger, preference, rule, procedure }
}

fn request(knowledge_type: KnowledgeType, operation: Operation, strategy: MergeStrategy) -> CommitRequest {
    CommitRequest {
        knowledge_type,
        operation,
        strategy,
        knowledge_id: None,
        name: None,
        content: None,
        refinement: None,
        agent_id: "agent-1".to_string(),
        tenant_id: None,
        feedback: Some("test feedback".to_string()),
        batch_job_id: None,
    }
}

#[test]
fn create_writes_store_history_and_registry() {
    let h = harness();
    let mut req = request(KnowledgeType::Preference, Operation::Create, MergeStrategy::CreateNew);
    req.content = Some(KnowledgeContent::preference("Prefer concise answers."));

    let result = h.committer.commit(&req).unwrap();
    let id = result.committed_id().unwrap().to_string();

    let item = h.preference.read("agent-1", &id).unwrap().unwrap();
    assert_eq!(item.content, KnowledgeContent::preference("Prefer concise answers."));

    let history = h.ledger.history_for_item(KnowledgeType::Preference, &id, 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].operation, KnowledgeOperation::Create);
    assert!(history[0].previous_content.is_none());
    assert_eq!(history[0].feedback_content.as_deref(), Some("test feedback"));

    let entry = h.ledger.get_registry("agent-1", KnowledgeType::Preference, &id).unwrap().unwrap();
    assert_eq!(entry.content_hash, item.content.content_hash().unwrap());
}

// An EXTENDS classification against a rule adds the new clause and keeps
// every existing clause byte-for-byte.
#[test]
fn extend_rule_preserves_existing_clauses() {
    let h = harness();
    h.rule.seed(builders::rule_item("rule-1", "agent-1", &[
        ("order total >= 1000", "require manager approval"),
        ("customer is new", "require prepayment"),
    ]));

    let mut req = request(KnowledgeType::Rule, Operation::Update, MergeStrategy::Extend);
    req.knowledge_id = Some("rule-1".to_string());
    req.content = Some(KnowledgeContent::rule(vec![RuleClause {
        condition: "order contains restricted items".to_string(),
        action: "require compliance review".to_string(),
    }]));

    let result = h.committer.commit(&req).unwrap();
    assert!(matches!(result.outcome, CommitOutcome::Committed { .. }));

    let item = h.rule.read("agent-1", "rule-1").unwrap().unwrap();
    let KnowledgeContent::Rule(rule) = &item.content else { panic!("expected rule") };
    assert_eq!(rule.clauses.len(), 3);
    assert_eq!(rule.clauses[0].condition, "order total >= 1000");
    assert_eq!(rule.clauses[1].condition, "customer is new");
    assert_eq!(rule.clauses[2].condition, "order contains restricted items");

    let history = h.ledger.history_for_item(KnowledgeType::Rule, "rule-1", 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].operation, KnowledgeOperation::Update);
    assert!(history[0].previous_content.is_some());
}

// A retried extend (same task claimed again after a crash) must not
// duplicate the clause.
#[test]
fn extend_retry_is_idempotent() {
    let h = harness();
    h.rule.seed(builders::rule_item("rule-1", "agent-1", &[("a", "x")]));

    let mut req = request(KnowledgeType::Rule, Operation::Update, MergeStrategy::Extend);
    req.knowledge_id = Some("rule-1".to_string());
    req.content = Some(KnowledgeContent::rule(vec![RuleClause {
        condition: "b".to_string(),
        action: "y".to_string(),
    }]));

    let first = h.committer.commit(&req).unwrap();
    assert!(matches!(first.outcome, CommitOutcome::Committed { .. }));

    let second = h.committer.commit(&req).unwrap();
    assert!(matches!(second.outcome, CommitOutcome::Skipped));

    let item = h.rule.read("agent-1", "rule-1").unwrap().unwrap();
    let KnowledgeContent::Rule(rule) = &item.content else { panic!("expected rule") };
    assert_eq!(rule.clauses.len(), 2);

    // Only the first commit reached the ledger.
    let history = h.ledger.history_for_item(KnowledgeType::Rule, "rule-1", 10).unwrap();
    assert_eq!(history.len(), 1);
}

// Conflicting feedback: no write anywhere, resolution left to the caller.
#[test]
fn conflict_escalates_without_any_write() {
    let h = harness();
    h.preference.seed(builders::preference_item("pref-1", "agent-1", "Deploy on Fridays."));

    let mut req = request(KnowledgeType::Preference, Operation::Update, MergeStrategy::ConflictEscalate);
    req.knowledge_id = Some("pref-1".to_string());
    req.content = Some(KnowledgeContent::preference("Never deploy on Fridays."));

    let result = h.committer.commit(&req).unwrap();
    assert_eq!(
        result.outcome,
        CommitOutcome::ConflictEscalated { target_id: Some("pref-1".to_string()) }
    );

    // Item untouched, ledger empty.
    let item = h.preference.read("agent-1", "pref-1").unwrap().unwrap();
    assert_eq!(item.content, KnowledgeContent::preference("Deploy on Fridays."));
    assert!(h.ledger.history_for_item(KnowledgeType::Preference, "pref-1", 10).unwrap().is_empty());
}

#[test]
fn duplicate_is_skipped_without_any_write() {
    let h = harness();
    h.preference.seed(builders::preference_item("pref-1", "agent-1", "Use spaces."));

    let mut req = request(KnowledgeType::Preference, Operation::Update, MergeStrategy::NoOp);
    req.knowledge_id = Some("pref-1".to_string());

    let result = h.committer.commit(&req).unwrap();
    assert_eq!(result.outcome, CommitOutcome::Skipped);
    assert!(h.ledger.history_for_item(KnowledgeType::Preference, "pref-1", 10).unwrap().is_empty());
}

// Supersedes: the incoming content replaces the item literally, no merging.
#[test]
fn replace_overwrites_literally() {
    let h = harness();
    h.preference.seed(builders::preference_item("pref-1", "agent-1", "Wrap at 80."));

    let mut req = request(KnowledgeType::Preference, Operation::Update, MergeStrategy::Replace);
    req.knowledge_id = Some("pref-1".to_string());
    req.content = Some(KnowledgeContent::preference("Wrap at 100."));

    h.committer.commit(&req).unwrap();

    let item = h.preference.read("agent-1", "pref-1").unwrap().unwrap();
    assert_eq!(item.content, KnowledgeContent::preference("Wrap at 100."));

    let history = h.ledger.history_for_item(KnowledgeType::Preference, "pref-1", 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(
        history[0].previous_content,
        Some(serde_json::to_value(KnowledgeContent::preference("Wrap at 80.")).unwrap())
    );
}

#[test]
fn refine_rewrites_only_the_located_fragment() {
    let h = harness();
    h.procedure.seed(builders::procedure_item("proc-1", "agent-1", &[
        "Export the ledger",
        "Email it to finance",
    ]));

    let mut req = request(KnowledgeType::Procedure, Operation::Update, MergeStrategy::Refine);
    req.knowledge_id = Some("proc-1".to_string());
    req.refinement = Some(loam_core::models::Refinement::Step {
        locate: "step-2".to_string(),
        replacement: "Upload it to the finance portal".to_string(),
    });

    h.committer.commit(&req).unwrap();

    let item = h.procedure.read("agent-1", "proc-1").unwrap().unwrap();
    let KnowledgeContent::Procedure(p) = &item.content else { panic!("expected procedure") };
    assert_eq!(p.steps[0].text, "Export the ledger");
    assert_eq!(p.steps[1].text, "Upload it to the finance portal");
}

#[test]
fn delete_is_idempotent_and_audited_once() {
    let h = harness();
    h.rule.seed(builders::rule_item("rule-1", "agent-1", &[("a", "x")]));

    let mut req = request(KnowledgeType::Rule, Operation::Delete, MergeStrategy::Replace);
    req.knowledge_id = Some("rule-1".to_string());

    let first = h.committer.commit(&req).unwrap();
    assert!(matches!(first.outcome, CommitOutcome::Committed { .. }));
    assert!(h.rule.read("agent-1", "rule-1").unwrap().is_none());

    let second = h.committer.commit(&req).unwrap();
    assert_eq!(second.outcome, CommitOutcome::Skipped);

    let history = h.ledger.history_for_item(KnowledgeType::Rule, "rule-1", 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].operation, KnowledgeOperation::Delete);
}

/// Store write fails after the merged content was determined: the ledger
// still gets a record, annotated with the failure.
#[test]
fn failed_store_write_leaves_annotated_history() {
    let h = harness();
    h.preference.seed(builders::preference_item("pref-1", "agent-1", "Use spaces."));
    h.preference.set_fail_writes(true);

    let mut req = request(KnowledgeType::Preference, Operation::Update, MergeStrategy::Extend);
    req.knowledge_id = Some("pref-1".to_string());
    req.content = Some(KnowledgeContent::preference("Wrap at 100."));

    assert!(h.committer.commit(&req).is_err());

    let history = h.ledger.history_for_item(KnowledgeType::Preference, "pref-1", 10).unwrap();
    assert_eq!(history.len(), 1);
    let new_content = history[0].new_content.as_ref().unwrap();
    assert!(new_content.get("not_applied").is_some());

    // The item itself is untouched.
    h.preference.set_fail_writes(false);
    let item = h.preference.read("agent-1", "pref-1").unwrap().unwrap();
    assert_eq!(item.content, KnowledgeContent::preference("Use spaces."));
}

// When the annotation write fails too, the caller still gets the store
// error, not the ledger error.
#[test]
fn store_error_survives_a_failed_annotation_write() {
    let h = harness();
    h.preference.seed(builders::preference_item("pref-1", "agent-1", "Use spaces."));
    h.preference.set_fail_writes(true);
    h.ledger
        .pool()
        .writer
        .with_conn_sync(|conn| {
            conn.execute_batch("DROP TABLE knowledge_history").unwrap();
            Ok(())
        })
        .unwrap();

    let mut req = request(KnowledgeType::Preference, Operation::Update, MergeStrategy::Extend);
    req.knowledge_id = Some("pref-1".to_string());
    req.content = Some(KnowledgeContent::preference("Wrap at 100."));

    let err = h.committer.commit(&req).unwrap_err();
    assert!(matches!(
        err,
        LoamError::Storage(StorageError::BackendUnavailable { .. })
    ));
}

#[test]
fn basic_authoring_strips_attachments_on_create_only() {
    let h = harness_with(CommitterConfig { procedure_authoring: ProcedureAuthoring::Basic });

    let mut content = ProcedureContent {
        overview: "Release".to_string(),
        steps: vec![ProcedureStep { label: "tag".to_string(), text: "Tag the commit".to_string() }],
        attachments: Default::default(),
    };
    content.attachments.insert("release.sh".to_string(), "#!/bin/sh".to_string());

    let mut req = request(KnowledgeType::Procedure, Operation::Create, MergeStrategy::CreateNew);
    req.content = Some(KnowledgeContent::Procedure(content));

    let result = h.committer.commit(&req).unwrap();
    let id = result.committed_id().unwrap().to_string();

    let item = h.procedure.read("agent-1", &id).unwrap().unwrap();
    let KnowledgeContent::Procedure(p) = &item.content else { panic!("expected procedure") };
    assert!(p.attachments.is_empty());
    assert_eq!(p.steps.len(), 1);

    // Extending an existing item keeps incoming attachments even under Basic.
    let mut incoming = ProcedureContent {
        overview: String::new(),
        steps: vec![],
        attachments: Default::default(),
    };
    incoming.attachments.insert("notes.md".to_string(), "# notes".to_string());

    let mut extend_req = request(KnowledgeType::Procedure, Operation::Update, MergeStrategy::Extend);
    extend_req.knowledge_id = Some(id.clone());
    extend_req.content = Some(KnowledgeContent::Procedure(incoming));
    h.committer.commit(&extend_req).unwrap();

    let item = h.procedure.read("agent-1", &id).unwrap().unwrap();
    let KnowledgeContent::Procedure(p) = &item.content else { panic!("expected procedure") };
    assert_eq!(p.attachments.len(), 1);
}

#[test]
fn update_against_missing_target_is_an_error() {
    let h = harness();
    let mut req = request(KnowledgeType::Rule, Operation::Update, MergeStrategy::Extend);
    req.knowledge_id = Some("rule-404".to_string());
    req.content = Some(KnowledgeContent::rule(vec![]));
    assert!(h.committer.commit(&req).is_err());
}
