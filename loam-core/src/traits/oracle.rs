use crate::errors::LoamResult;
use crate::knowledge::KnowledgeItem;
use crate::models::{Classification, SimilarityJudgment};

/// External judgment: how does a piece of feedback relate to what an agent
/// already knows?
///
/// `candidates` are the agent's existing items of the relevant type. The
/// oracle returns the relationship plus, where applicable, the matched target
/// and authored content.
pub trait ClassificationOracle: Send + Sync {
    fn classify(
        &self,
        feedback: &str,
        candidates: &[KnowledgeItem],
    ) -> LoamResult<Classification>;
}

/// External judgment: do two stored items carry overlapping knowledge, and
/// what should happen to the second one?
pub trait SimilarityOracle: Send + Sync {
    fn compare(&self, a: &KnowledgeItem, b: &KnowledgeItem) -> LoamResult<SimilarityJudgment>;
}
