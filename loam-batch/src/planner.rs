//! Per-agent dedup planning. Pure: reads items and the oracle, produces a
//! `DedupPlan`, mutates nothing.
//!
//! Determinism: items are visited in (type, id) order and an item already
//! marked for deletion or move is never consulted again, so the same items
//! and judgments always produce the same plan.

use std::collections::HashMap;

use loam_core::errors::LoamResult;
use loam_core::knowledge::KnowledgeItem;
use loam_core::models::{DedupAction, DedupPlan, SuggestedAction};
use loam_core::traits::SimilarityOracle;

/// Build the plan for one agent from its full item list.
pub fn plan_agent(
    agent_id: &str,
    mut items: Vec<KnowledgeItem>,
    oracle: &dyn SimilarityOracle,
) -> LoamResult<DedupPlan> {
    items.sort_by(|a, b| {
        (a.knowledge_type.as_str(), a.id.as_str()).cmp(&(b.knowledge_type.as_str(), b.id.as_str()))
    });

    // Index -> planned destructive action.
    let mut marked: HashMap<usize, DedupAction> = HashMap::new();

    for i in 0..items.len() {
        if marked.contains_key(&i) {
            continue;
        }
        for j in (i + 1)..items.len() {
            if marked.contains_key(&j) {
                continue;
            }
            let judgment = oracle.compare(&items[i], &items[j])?;
            if !judgment.redundant {
                continue;
            }
            let b = &items[j];
            let action = match judgment.suggested {
                SuggestedAction::Keep => continue,
                SuggestedAction::Delete => DedupAction::Delete {
                    storage_type: b.knowledge_type,
                    item_id: b.id.clone(),
                    reason: format!("redundant with {} (score {:.2})", items[i].id, judgment.score),
                },
                SuggestedAction::Move { to, content } => DedupAction::Move {
                    storage_type: b.knowledge_type,
                    item_id: b.id.clone(),
                    to,
                    content,
                    reason: format!("better expressed as {to} (score {:.2})", judgment.score),
                },
            };
            marked.insert(j, action);
        }
    }

    let actions = items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            marked.remove(&idx).unwrap_or(DedupAction::Keep {
                storage_type: item.knowledge_type,
                item_id: item.id.clone(),
            })
        })
        .collect();

    Ok(DedupPlan::new(agent_id, actions))
}
