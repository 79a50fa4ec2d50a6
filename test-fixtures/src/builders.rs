//! Item builders with minimal ceremony.

use loam_core::knowledge::{
    KnowledgeContent, KnowledgeItem, KnowledgeType, ProcedureContent, ProcedureStep, RuleClause,
};

pub fn preference_item(id: &str, agent_id: &str, text: &str) -> KnowledgeItem {
    KnowledgeItem {
        knowledge_type: KnowledgeType::Preference,
        id: id.to_string(),
        name: format!("preference {id}"),
        content: KnowledgeContent::preference(text),
        agent_id: agent_id.to_string(),
        tenant_id: None,
    }
}

pub fn rule_item(id: &str, agent_id: &str, clauses: &[(&str, &str)]) -> KnowledgeItem {
    KnowledgeItem {
        knowledge_type: KnowledgeType::Rule,
        id: id.to_string(),
        name: format!("rule {id}"),
        content: KnowledgeContent::rule(
            clauses
                .iter()
                .map(|(condition, action)| RuleClause {
                    condition: condition.to_string(),
                    action: action.to_string(),
                })
                .collect(),
        ),
        agent_id: agent_id.to_string(),
        tenant_id: None,
    }
}

pub fn procedure_item(id: &str, agent_id: &str, steps: &[&str]) -> KnowledgeItem {
    KnowledgeItem {
        knowledge_type: KnowledgeType::Procedure,
        id: id.to_string(),
        name: format!("procedure {id}"),
        content: KnowledgeContent::Procedure(ProcedureContent {
            overview: String::new(),
            steps: steps
                .iter()
                .enumerate()
                .map(|(i, text)| ProcedureStep {
                    label: format!("step-{}", i + 1),
                    text: text.to_string(),
                })
                .collect(),
            attachments: Default::default(),
        }),
        agent_id: agent_id.to_string(),
        tenant_id: None,
    }
}
