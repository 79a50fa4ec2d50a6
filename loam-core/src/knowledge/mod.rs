//! Knowledge item model shared by every store.

pub mod content;
pub mod item;

pub use content::{
    KnowledgeContent, PreferenceContent, ProcedureContent, ProcedureStep, RuleClause, RuleContent,
};
pub use item::{KnowledgeItem, KnowledgeType};
