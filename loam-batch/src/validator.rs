//! Plan validation against the batch safety limits.
//!
//! Soft cap: log a warning and proceed. Hard cap: reject the whole plan
//! before any mutation.

use std::collections::HashMap;

use loam_core::config::BatchConfig;
use loam_core::errors::{BatchError, LoamError, LoamResult};
use loam_core::knowledge::KnowledgeType;
use loam_core::models::{DedupAction, DedupPlan};

pub fn validate(plan: &DedupPlan, config: &BatchConfig) -> LoamResult<()> {
    let mut errors = Vec::new();
    let destructive = plan.summary.destructive();

    if destructive > config.max_destructive_actions {
        errors.push(format!(
            "plan for agent {} proposes {destructive} destructive actions, limit is {}",
            plan.agent_id, config.max_destructive_actions
        ));
    }
    for action in &plan.actions {
        if let DedupAction::Move { storage_type, item_id, to, .. } = action {
            if to == storage_type {
                errors.push(format!("move of {item_id} targets its own type {to}"));
            }
        }
    }

    // A type that had items must keep at least one.
    let mut per_type: HashMap<KnowledgeType, (u32, u32)> = HashMap::new();
    for action in &plan.actions {
        let entry = per_type.entry(action.storage_type()).or_default();
        entry.0 += 1;
        if action.is_destructive() {
            entry.1 += 1;
        }
    }
    for (knowledge_type, (total, destructive)) in per_type {
        if total > 0 && destructive == total {
            errors.push(format!(
                "plan would remove all {total} {knowledge_type} items for agent {}",
                plan.agent_id
            ));
        }
    }

    if !errors.is_empty() {
        return Err(LoamError::Batch(BatchError::Validation { errors }));
    }

    if destructive > config.warn_destructive_actions {
        tracing::warn!(
            agent_id = %plan.agent_id,
            destructive,
            warn_limit = config.warn_destructive_actions,
            "plan exceeds the destructive-action warning threshold"
        );
    }
    Ok(())
}
