//! Merge command.

use super::{Workspace, build_summarizer};
use crate::Result;
use crate::models::{ActingUser, SkillId};
use crate::security::ensure_can_edit;
use crate::services::{
    ConsolidationOrchestrator, LibraryState, MergeReport, NoopSummarizer, ProvenanceMerger,
    Summarizer,
};

/// Merges `ids` into one skill on behalf of `actor`.
///
/// With `use_llm` off, or no provider configured, the merged content is the
/// deterministic fallback and the result is flagged unreviewed.
///
/// # Errors
///
/// Returns an error if an id is unknown, the actor may not edit one of the
/// skills, fewer than two distinct ids are given, or the target cannot be
/// persisted.
pub fn cmd_merge(
    workspace: &Workspace,
    ids: &[SkillId],
    use_llm: bool,
    actor: &ActingUser,
) -> Result<String> {
    let store = workspace.store();
    let mut state = LibraryState::load(store.as_ref())?;
    for skill in workspace.load_skills(ids)? {
        ensure_can_edit(&skill, actor)?;
    }

    let summarizer: Box<dyn Summarizer> = if use_llm {
        build_summarizer(&workspace.config().llm)
    } else {
        Box::new(NoopSummarizer)
    };
    let orchestrator = ConsolidationOrchestrator::new(store).with_merger(
        ProvenanceMerger::new().with_separator(workspace.config().merge_separator.clone()),
    );

    let prepared = orchestrator.prepare(&state, ids, summarizer.as_ref())?;
    let report = orchestrator.apply_prepared(&mut state, &prepared, actor)?;
    Ok(render_merge_report(&report))
}

/// Renders a merge report for the terminal.
pub(super) fn render_merge_report(report: &MergeReport) -> String {
    let mut lines = vec![report.summary()];
    for (id, error) in &report.failed_deletes {
        lines.push(format!("  could not delete {id}: {error}"));
    }
    if let Some(warning) = &report.warning {
        lines.push(format!("Warning: {warning}. Review '{}' before relying on it.", report.target.id));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::Error;
    use crate::config::SkillVaultConfig;
    use crate::models::{Owner, Skill};
    use crate::storage::InMemoryEntryStore;
    use std::sync::Arc;

    fn workspace() -> Workspace {
        let mut owned = Skill::new("b", "Owned", "long owned content");
        owned.owners = vec![Owner::named("Ana").with_email("ana@example.com")];
        let store = Arc::new(InMemoryEntryStore::with_skills(vec![
            Skill::new("a", "Short", "tiny"),
            owned,
        ]));
        Workspace::with_store(SkillVaultConfig::default(), store)
            .unwrap()
    }

    #[test]
    fn test_merge_without_llm_is_unreviewed() {
        let ws = workspace();
        let ids = [SkillId::new("a"), SkillId::new("b")];
        let out = cmd_merge(&ws, &ids, false, &ActingUser::with_email("ANA@example.com")).unwrap();
        assert!(out.starts_with("Merged 2 entries into 'Owned' [unreviewed]"));
        assert!(out.contains("Warning:"));
        assert_eq!(ws.store().count().unwrap(), 1);
    }

    #[test]
    fn test_merge_requires_edit_access() {
        let ws = workspace();
        let ids = [SkillId::new("a"), SkillId::new("b")];
        let result = cmd_merge(&ws, &ids, false, &ActingUser::with_id("someone-else"));
        assert!(matches!(result, Err(Error::Unauthorized(_))));
        assert_eq!(ws.store().count().unwrap(), 2);
    }
}
