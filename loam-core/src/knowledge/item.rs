use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::content::KnowledgeContent;
use crate::errors::StorageError;

/// The three knowledge stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeType {
    /// Guidelines, preferences, contextual notes (vector store backed).
    Preference,
    /// Condition → action business rules (relational rule table).
    Rule,
    /// Step-by-step procedures with attachment files (document store).
    Procedure,
}

impl KnowledgeType {
    pub const ALL: [KnowledgeType; 3] = [
        KnowledgeType::Preference,
        KnowledgeType::Rule,
        KnowledgeType::Procedure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeType::Preference => "preference",
            KnowledgeType::Rule => "rule",
            KnowledgeType::Procedure => "procedure",
        }
    }
}

impl fmt::Display for KnowledgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnowledgeType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preference" => Ok(KnowledgeType::Preference),
            "rule" => Ok(KnowledgeType::Rule),
            "procedure" => Ok(KnowledgeType::Procedure),
            other => Err(StorageError::InvalidColumn {
                column: "knowledge_type".into(),
                value: other.into(),
            }),
        }
    }
}

/// One unit of stored knowledge. `(agent_id, knowledge_type, id)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub knowledge_type: KnowledgeType,
    /// Store-local identifier, unique within `knowledge_type` per agent.
    pub id: String,
    pub name: String,
    pub content: KnowledgeContent,
    pub agent_id: String,
    pub tenant_id: Option<String>,
}

impl KnowledgeItem {
    /// Content hash for registry change detection.
    pub fn content_hash(&self) -> crate::errors::LoamResult<String> {
        self.content.content_hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knowledge_type_round_trips_through_str() {
        for kt in KnowledgeType::ALL {
            assert_eq!(kt.as_str().parse::<KnowledgeType>().unwrap(), kt);
        }
    }

    #[test]
    fn unknown_type_string_is_rejected() {
        assert!("skill".parse::<KnowledgeType>().is_err());
    }
}
