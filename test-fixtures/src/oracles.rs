//! Scripted oracle doubles. Fully deterministic: they answer from a queue or
//! a pair table and never look at the inputs beyond identity.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use loam_core::errors::{LoamError, LoamResult, OracleError};
use loam_core::knowledge::KnowledgeItem;
use loam_core::models::{Classification, SimilarityJudgment, SuggestedAction};
use loam_core::traits::{ClassificationOracle, SimilarityOracle};

/// Classification oracle that replays a fixed script, one answer per call.
pub struct ScriptedClassifier {
    script: Mutex<VecDeque<Classification>>,
}

impl ScriptedClassifier {
    pub fn new(answers: impl IntoIterator<Item = Classification>) -> Self {
        Self {
            script: Mutex::new(answers.into_iter().collect()),
        }
    }

    /// Answers not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl ClassificationOracle for ScriptedClassifier {
    fn classify(
        &self,
        _feedback: &str,
        _candidates: &[KnowledgeItem],
    ) -> LoamResult<Classification> {
        let mut script = self.script.lock().map_err(|_| {
            LoamError::Oracle(OracleError::Unavailable {
                name: "scripted-classifier".to_string(),
                reason: "lock poisoned".to_string(),
            })
        })?;
        script.pop_front().ok_or_else(|| {
            LoamError::Oracle(OracleError::Unavailable {
                name: "scripted-classifier".to_string(),
                reason: "script exhausted".to_string(),
            })
        })
    }
}

/// Similarity oracle keyed by item-id pairs. Unknown pairs are judged
/// non-redundant with a Keep suggestion.
#[derive(Default)]
pub struct PairSimilarity {
    judgments: HashMap<(String, String), SimilarityJudgment>,
}

impl PairSimilarity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the judgment for the pair `(a, b)`, in either order.
    pub fn judge(mut self, a: &str, b: &str, judgment: SimilarityJudgment) -> Self {
        self.judgments.insert((a.to_string(), b.to_string()), judgment);
        self
    }
}

impl SimilarityOracle for PairSimilarity {
    fn compare(&self, a: &KnowledgeItem, b: &KnowledgeItem) -> LoamResult<SimilarityJudgment> {
        let forward = (a.id.clone(), b.id.clone());
        let backward = (b.id.clone(), a.id.clone());
        Ok(self
            .judgments
            .get(&forward)
            .or_else(|| self.judgments.get(&backward))
            .cloned()
            .unwrap_or(SimilarityJudgment {
                redundant: false,
                score: 0.0,
                suggested: SuggestedAction::Keep,
            }))
    }
}
