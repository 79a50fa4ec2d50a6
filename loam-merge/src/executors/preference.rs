//! Preference merges: free-text bodies.

use loam_core::errors::{LoamError, LoamResult, MergeError};
use loam_core::knowledge::{KnowledgeContent, PreferenceContent};

use super::Merged;

/// Append the incoming text as a new paragraph, unless the existing body
/// already contains it.
pub fn extend(existing: &PreferenceContent, incoming: &PreferenceContent) -> Merged {
    let addition = incoming.text.trim();
    if addition.is_empty() || existing.text.contains(addition) {
        return Merged::Unchanged;
    }
    let mut text = existing.text.trim_end().to_string();
    if !text.is_empty() {
        text.push_str("\n\n");
    }
    text.push_str(addition);
    Merged::Changed(KnowledgeContent::Preference(PreferenceContent { text }))
}

/// Replace the first occurrence of `locate` with `replacement`.
pub fn refine(
    existing: &PreferenceContent,
    locate: &str,
    replacement: &str,
) -> LoamResult<Merged> {
    let Some(pos) = existing.text.find(locate) else {
        return Err(LoamError::Merge(MergeError::FragmentNotFound {
            locate: locate.to_string(),
        }));
    };
    let mut text = existing.text.clone();
    text.replace_range(pos..pos + locate.len(), replacement);
    if text == existing.text {
        return Ok(Merged::Unchanged);
    }
    Ok(Merged::Changed(KnowledgeContent::Preference(PreferenceContent { text })))
}
