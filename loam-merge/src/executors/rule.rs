//! Rule merges: clause-set union and clause-level refinement.
//!
//! Extending never rewrites existing clauses. An exception to a rule arrives
//! as an extra clause, so the general case and its exception coexist.

use loam_core::errors::{LoamError, LoamResult, MergeError};
use loam_core::knowledge::{KnowledgeContent, RuleContent};

use super::Merged;

/// Append incoming clauses that are not already present. Clause equality is
/// exact (condition, action).
pub fn extend(existing: &RuleContent, incoming: &RuleContent) -> Merged {
    let additions: Vec<_> = incoming
        .clauses
        .iter()
        .filter(|clause| !existing.clauses.contains(clause))
        .cloned()
        .collect();
    if additions.is_empty() {
        return Merged::Unchanged;
    }
    let mut clauses = existing.clauses.clone();
    clauses.extend(additions);
    Merged::Changed(KnowledgeContent::Rule(RuleContent { clauses }))
}

/// Replace the action of the clause whose condition matches exactly.
pub fn refine(existing: &RuleContent, condition: &str, action: &str) -> LoamResult<Merged> {
    let Some(idx) = existing.clauses.iter().position(|c| c.condition == condition) else {
        return Err(LoamError::Merge(MergeError::FragmentNotFound {
            locate: condition.to_string(),
        }));
    };
    if existing.clauses[idx].action == action {
        return Ok(Merged::Unchanged);
    }
    let mut clauses = existing.clauses.clone();
    clauses[idx].action = action.to_string();
    Ok(Merged::Changed(KnowledgeContent::Rule(RuleContent { clauses })))
}
