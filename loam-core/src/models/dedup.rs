use serde::{Deserialize, Serialize};

use crate::knowledge::{KnowledgeContent, KnowledgeType};

/// Oracle verdict for one pair of items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityJudgment {
    /// True when the pair carries overlapping knowledge.
    pub redundant: bool,
    /// Similarity in [0.0, 1.0].
    pub score: f64,
    /// What to do with the second item of the pair.
    pub suggested: SuggestedAction,
}

/// Action the similarity oracle suggests for an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SuggestedAction {
    Keep,
    Delete,
    /// Re-home to a different knowledge type. `content` is the oracle's
    /// rewrite for the target type; None falls back to mechanical conversion.
    Move {
        to: KnowledgeType,
        content: Option<KnowledgeContent>,
    },
}

/// Planned action for a single item within one agent's dedup pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DedupAction {
    Keep {
        storage_type: KnowledgeType,
        item_id: String,
    },
    Delete {
        storage_type: KnowledgeType,
        item_id: String,
        reason: String,
    },
    Move {
        storage_type: KnowledgeType,
        item_id: String,
        to: KnowledgeType,
        /// Rewritten content for the target type, when the oracle supplied one.
        content: Option<KnowledgeContent>,
        reason: String,
    },
}

impl DedupAction {
    pub fn storage_type(&self) -> KnowledgeType {
        match self {
            DedupAction::Keep { storage_type, .. }
            | DedupAction::Delete { storage_type, .. }
            | DedupAction::Move { storage_type, .. } => *storage_type,
        }
    }

    pub fn item_id(&self) -> &str {
        match self {
            DedupAction::Keep { item_id, .. }
            | DedupAction::Delete { item_id, .. }
            | DedupAction::Move { item_id, .. } => item_id,
        }
    }

    pub fn is_destructive(&self) -> bool {
        !matches!(self, DedupAction::Keep { .. })
    }
}

/// Aggregate counts over a plan, by action kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub kept: u32,
    pub deleted: u32,
    pub moved: u32,
}

impl PlanSummary {
    pub fn destructive(&self) -> u32 {
        self.deleted + self.moved
    }
}

/// Deterministic, side-effect-free plan for one agent. The same inputs always
/// produce the same plan; execution (if any) happens strictly afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupPlan {
    pub agent_id: String,
    pub actions: Vec<DedupAction>,
    pub summary: PlanSummary,
}

impl DedupPlan {
    pub fn new(agent_id: impl Into<String>, actions: Vec<DedupAction>) -> Self {
        let mut summary = PlanSummary::default();
        for action in &actions {
            match action {
                DedupAction::Keep { .. } => summary.kept += 1,
                DedupAction::Delete { .. } => summary.deleted += 1,
                DedupAction::Move { .. } => summary.moved += 1,
            }
        }
        Self { agent_id: agent_id.into(), actions, summary }
    }
}
