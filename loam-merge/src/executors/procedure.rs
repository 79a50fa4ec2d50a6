//! Procedure merges: step-set union with identity dedup, attachment merge,
//! and step-level refinement.

use loam_core::errors::{LoamError, LoamResult, MergeError};
use loam_core::knowledge::{KnowledgeContent, ProcedureContent, ProcedureStep};

use super::Merged;

/// Step identity: the label when present, otherwise the normalized text.
fn step_key(step: &ProcedureStep) -> String {
    if step.label.is_empty() {
        normalize(&step.text)
    } else {
        format!("label:{}", step.label)
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Append incoming steps whose identity is new, merge attachments by path
/// (existing paths win), and keep the existing overview unless it is empty.
pub fn extend(existing: &ProcedureContent, incoming: &ProcedureContent) -> Merged {
    let known: Vec<String> = existing.steps.iter().map(step_key).collect();
    let new_steps: Vec<_> = incoming
        .steps
        .iter()
        .filter(|step| !known.contains(&step_key(step)))
        .cloned()
        .collect();

    let new_attachments: Vec<_> = incoming
        .attachments
        .iter()
        .filter(|(path, _)| !existing.attachments.contains_key(*path))
        .map(|(path, body)| (path.clone(), body.clone()))
        .collect();

    let take_overview = existing.overview.is_empty() && !incoming.overview.is_empty();

    if new_steps.is_empty() && new_attachments.is_empty() && !take_overview {
        return Merged::Unchanged;
    }

    let mut merged = existing.clone();
    merged.steps.extend(new_steps);
    merged.attachments.extend(new_attachments);
    if take_overview {
        merged.overview = incoming.overview.clone();
    }
    Merged::Changed(KnowledgeContent::Procedure(merged))
}

/// Replace the text of the step located by exact label or text fragment.
pub fn refine(
    existing: &ProcedureContent,
    locate: &str,
    replacement: &str,
) -> LoamResult<Merged> {
    let idx = existing
        .steps
        .iter()
        .position(|step| step.label == locate)
        .or_else(|| existing.steps.iter().position(|step| step.text.contains(locate)));
    let Some(idx) = idx else {
        return Err(LoamError::Merge(MergeError::FragmentNotFound {
            locate: locate.to_string(),
        }));
    };
    if existing.steps[idx].text == replacement {
        return Ok(Merged::Unchanged);
    }
    let mut merged = existing.clone();
    merged.steps[idx].text = replacement.to_string();
    Ok(Merged::Changed(KnowledgeContent::Procedure(merged)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn step(label: &str, text: &str) -> ProcedureStep {
        ProcedureStep { label: label.to_string(), text: text.to_string() }
    }

    fn proc(steps: Vec<ProcedureStep>) -> ProcedureContent {
        ProcedureContent { overview: String::new(), steps, attachments: BTreeMap::new() }
    }

    #[test]
    fn extend_appends_new_steps_in_order() {
        let existing = proc(vec![step("fetch", "Fetch the data"), step("clean", "Clean it")]);
        let incoming = proc(vec![step("report", "Write the report")]);

        let Merged::Changed(KnowledgeContent::Procedure(merged)) = extend(&existing, &incoming)
        else {
            panic!("expected changed procedure");
        };
        assert_eq!(merged.steps.len(), 3);
        assert_eq!(merged.steps[2].label, "report");
    }

    #[test]
    fn extend_dedups_by_label_then_normalized_text() {
        let existing = proc(vec![step("fetch", "Fetch the data"), step("", "Clean it up")]);

        // Same label, different text: identity matches, no duplicate.
        let by_label = proc(vec![step("fetch", "Fetch everything")]);
        assert_eq!(extend(&existing, &by_label), Merged::Unchanged);

        // No label, text differs only in case and spacing: still a duplicate.
        let by_text = proc(vec![step("", "  clean   IT up ")]);
        assert_eq!(extend(&existing, &by_text), Merged::Unchanged);
    }

    #[test]
    fn extend_merges_attachments_existing_wins() {
        let mut existing = proc(vec![step("run", "Run it")]);
        existing.attachments.insert("run.sh".into(), "#!/bin/sh\necho old".into());

        let mut incoming = proc(vec![]);
        incoming.attachments.insert("run.sh".into(), "#!/bin/sh\necho new".into());
        incoming.attachments.insert("notes.md".into(), "# Notes".into());

        let Merged::Changed(KnowledgeContent::Procedure(merged)) = extend(&existing, &incoming)
        else {
            panic!("expected changed procedure");
        };
        assert_eq!(merged.attachments["run.sh"], "#!/bin/sh\necho old");
        assert_eq!(merged.attachments["notes.md"], "# Notes");
    }

    #[test]
    fn extend_takes_overview_only_when_empty() {
        let existing = proc(vec![step("a", "A")]);
        let mut incoming = proc(vec![]);
        incoming.overview = "Monthly close".to_string();

        let Merged::Changed(KnowledgeContent::Procedure(merged)) = extend(&existing, &incoming)
        else {
            panic!("expected changed procedure");
        };
        assert_eq!(merged.overview, "Monthly close");

        // A second pass with the same overview is a no-op.
        assert_eq!(extend(&merged, &incoming), Merged::Unchanged);
    }

    #[test]
    fn refine_by_label_and_by_fragment() {
        let existing = proc(vec![step("fetch", "Fetch the data"), step("", "Send summary email")]);

        let Merged::Changed(KnowledgeContent::Procedure(by_label)) =
            refine(&existing, "fetch", "Fetch from the new endpoint").unwrap()
        else {
            panic!("expected changed procedure");
        };
        assert_eq!(by_label.steps[0].text, "Fetch from the new endpoint");

        let Merged::Changed(KnowledgeContent::Procedure(by_text)) =
            refine(&existing, "summary email", "Post summary to the channel").unwrap()
        else {
            panic!("expected changed procedure");
        };
        assert_eq!(by_text.steps[1].text, "Post summary to the channel");
    }

    #[test]
    fn refine_unknown_step_is_an_error() {
        let existing = proc(vec![step("a", "A")]);
        assert!(refine(&existing, "missing", "B").is_err());
    }
}
