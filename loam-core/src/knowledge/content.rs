use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::LoamResult;

/// Free-text preference body (guidelines, context, experience notes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceContent {
    pub text: String,
}

/// One condition → action pair inside a rule.
///
/// Clauses are independently matchable: a merged rule keeps every original
/// clause intact instead of rewriting them into a combined expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleClause {
    pub condition: String,
    pub action: String,
}

/// Structured business rule: an ordered set of clauses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleContent {
    pub clauses: Vec<RuleClause>,
}

/// One step of a procedure. `label` is the step identity used for
/// deduplication during merges; when empty, the normalized text is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureStep {
    #[serde(default)]
    pub label: String,
    pub text: String,
}

/// Procedure document: overview, ordered steps, and attachment files
/// (scripts, reference docs) keyed by relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureContent {
    #[serde(default)]
    pub overview: String,
    pub steps: Vec<ProcedureStep>,
    #[serde(default)]
    pub attachments: BTreeMap<String, String>,
}

/// Typed content wrapper — each knowledge type has its own content struct.
/// Serialized as a tagged enum so the type is preserved in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeContent {
    Preference(PreferenceContent),
    Rule(RuleContent),
    Procedure(ProcedureContent),
}

impl KnowledgeContent {
    pub fn preference(text: impl Into<String>) -> Self {
        Self::Preference(PreferenceContent { text: text.into() })
    }

    pub fn rule(clauses: Vec<RuleClause>) -> Self {
        Self::Rule(RuleContent { clauses })
    }

    /// Compute the blake3 content hash from the serialized content.
    pub fn content_hash(&self) -> LoamResult<String> {
        let serialized = serde_json::to_string(self)?;
        Ok(blake3::hash(serialized.as_bytes()).to_hex().to_string())
    }

    /// Short human-readable summary for the registry.
    pub fn summary(&self) -> String {
        const MAX: usize = 120;
        let full = match self {
            KnowledgeContent::Preference(p) => p.text.clone(),
            KnowledgeContent::Rule(r) => r
                .clauses
                .iter()
                .map(|c| format!("if {} then {}", c.condition, c.action))
                .collect::<Vec<_>>()
                .join("; "),
            KnowledgeContent::Procedure(p) => {
                if p.overview.is_empty() {
                    p.steps
                        .iter()
                        .map(|s| s.text.as_str())
                        .collect::<Vec<_>>()
                        .join(" -> ")
                } else {
                    p.overview.clone()
                }
            }
        };
        match full.char_indices().nth(MAX) {
            Some((idx, _)) => full[..idx].to_string(),
            None => full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_stable_per_content() {
        let a = KnowledgeContent::preference("prefer concise answers");
        let b = KnowledgeContent::preference("prefer concise answers");
        let c = KnowledgeContent::preference("prefer verbose answers");
        assert_eq!(a.content_hash().unwrap(), b.content_hash().unwrap());
        assert_ne!(a.content_hash().unwrap(), c.content_hash().unwrap());
    }

    #[test]
    fn summary_truncates_long_text() {
        let text = "x".repeat(500);
        let content = KnowledgeContent::preference(text);
        assert_eq!(content.summary().chars().count(), 120);
    }

    #[test]
    fn tagged_serialization_round_trips() {
        let content = KnowledgeContent::rule(vec![RuleClause {
            condition: "order >= 1_000_000".into(),
            action: "require approval".into(),
        }]);
        let json = serde_json::to_string(&content).unwrap();
        assert!(json.contains("\"type\":\"rule\""));
        let back: KnowledgeContent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, content);
    }
}
