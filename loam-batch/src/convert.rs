//! Mechanical content conversion between knowledge types, used when a move
//! action arrives without oracle-authored content for the target type.
//!
//! The conversions are lossy but total: any content can be re-homed to any
//! type. Oracle-supplied rewrites are always preferred.

use loam_core::knowledge::{
    KnowledgeContent, KnowledgeType, PreferenceContent, ProcedureContent, ProcedureStep,
    RuleClause, RuleContent,
};

/// Convert `content` into the target type. Converting to the same type is
/// the identity.
pub fn convert(content: &KnowledgeContent, to: KnowledgeType) -> KnowledgeContent {
    match (content, to) {
        (KnowledgeContent::Preference(_), KnowledgeType::Preference)
        | (KnowledgeContent::Rule(_), KnowledgeType::Rule)
        | (KnowledgeContent::Procedure(_), KnowledgeType::Procedure) => content.clone(),

        (_, KnowledgeType::Preference) => {
            KnowledgeContent::Preference(PreferenceContent { text: flatten(content) })
        }
        (_, KnowledgeType::Rule) => KnowledgeContent::Rule(to_rule(content)),
        (_, KnowledgeType::Procedure) => KnowledgeContent::Procedure(to_procedure(content)),
    }
}

/// Flatten any content into readable text.
fn flatten(content: &KnowledgeContent) -> String {
    match content {
        KnowledgeContent::Preference(p) => p.text.clone(),
        KnowledgeContent::Rule(r) => r
            .clauses
            .iter()
            .map(|c| format!("If {} then {}.", c.condition, c.action))
            .collect::<Vec<_>>()
            .join("\n"),
        KnowledgeContent::Procedure(p) => {
            let mut lines = Vec::new();
            if !p.overview.is_empty() {
                lines.push(p.overview.clone());
            }
            lines.extend(p.steps.iter().map(|s| s.text.clone()));
            lines.join("\n")
        }
    }
}

/// First line becomes the condition, the rest the action. A single line
/// becomes an unconditional clause.
fn to_rule(content: &KnowledgeContent) -> RuleContent {
    let text = flatten(content);
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let first = lines.next().unwrap_or("").trim().to_string();
    let rest = lines.map(str::trim).collect::<Vec<_>>().join(" ");

    let clause = if rest.is_empty() {
        RuleClause { condition: "always".to_string(), action: first }
    } else {
        RuleClause { condition: first, action: rest }
    };
    RuleContent { clauses: vec![clause] }
}

/// Each non-empty line becomes one step.
fn to_procedure(content: &KnowledgeContent) -> ProcedureContent {
    let text = flatten(content);
    ProcedureContent {
        overview: String::new(),
        steps: text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| ProcedureStep { label: String::new(), text: l.trim().to_string() })
            .collect(),
        attachments: Default::default(),
    }
}
