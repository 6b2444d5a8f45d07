//! Library consolidation.
//!
//! Drives a merge end to end: look the entries up in the explicit
//! [`LibraryState`], pick the target, draft the merged content, then persist
//! the target *before* deleting any loser. A failed target write aborts with
//! zero deletes; a failed loser delete is reported but never rolls back the
//! target.

use super::event_meta;
use super::identity_merge::dedupe_by_key;
use super::provenance::{MergeDraft, ProvenanceMerger, Summarizer, select_merge_target};
use crate::models::{
    ActingUser, EntryEvent, HistoryAction, HistoryEntry, LibraryAnalysis, Recommendation,
    RecommendationKey, Skill, SkillId, SkillPatch,
};
use crate::observability::{current_correlation_id, record_event};
use crate::storage::EntryStore;
use crate::{Error, Result};
use chrono::Utc;
use std::collections::{BTreeSet, HashSet};
use std::time::Instant;
use tracing::{info_span, instrument};

/// Application state the orchestrator reads and updates.
///
/// Passed by reference into every operation; there is no global state.
#[derive(Debug, Clone, Default)]
pub struct LibraryState {
    /// Skills in store order.
    pub skills: Vec<Skill>,
    /// Selected skill ids.
    pub selection: BTreeSet<SkillId>,
    /// Latest analysis, if one was run.
    pub analysis: Option<LibraryAnalysis>,
    /// Recommendations already acted on.
    pub resolved_recommendations: HashSet<RecommendationKey>,
}

impl LibraryState {
    /// Creates state over `skills`.
    #[must_use]
    pub fn new(skills: Vec<Skill>) -> Self {
        Self {
            skills,
            ..Self::default()
        }
    }

    /// Loads state from a store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot list skills.
    pub fn load<S: EntryStore + ?Sized>(store: &S) -> Result<Self> {
        Ok(Self::new(store.list()?))
    }

    /// Looks up a skill by id.
    #[must_use]
    pub fn get(&self, id: &SkillId) -> Option<&Skill> {
        self.skills.iter().find(|s| &s.id == id)
    }

    /// Replaces the skill with the same id in place, or appends it.
    pub fn replace_skill(&mut self, skill: Skill) {
        if let Some(existing) = self.skills.iter_mut().find(|s| s.id == skill.id) {
            *existing = skill;
        } else {
            self.skills.push(skill);
        }
    }

    /// Removes skills and drops them from the selection.
    pub fn remove_skills(&mut self, ids: &[SkillId]) {
        let ids: HashSet<&SkillId> = ids.iter().collect();
        self.skills.retain(|s| !ids.contains(&s.id));
        self.selection.retain(|id| !ids.contains(id));
    }

    /// Selects a skill. Returns false if it is not in the library.
    pub fn select(&mut self, id: SkillId) -> bool {
        if self.get(&id).is_none() {
            return false;
        }
        self.selection.insert(id)
    }

    /// Deselects a skill.
    pub fn deselect(&mut self, id: &SkillId) -> bool {
        self.selection.remove(id)
    }

    /// Clears the selection.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected skills, in library order.
    #[must_use]
    pub fn selected_skills(&self) -> Vec<Skill> {
        self.skills
            .iter()
            .filter(|s| self.selection.contains(&s.id))
            .cloned()
            .collect()
    }

    /// Recommendations from the latest analysis not yet resolved.
    #[must_use]
    pub fn open_recommendations(&self) -> Vec<&Recommendation> {
        self.analysis
            .iter()
            .flat_map(|a| a.recommendations.iter())
            .filter(|r| !self.resolved_recommendations.contains(&r.key()))
            .collect()
    }

    /// Marks a recommendation as resolved.
    pub fn mark_resolved(&mut self, key: RecommendationKey) {
        self.resolved_recommendations.insert(key);
    }
}

/// A draft together with the entries it was computed from.
#[derive(Debug, Clone)]
pub struct PreparedMerge {
    /// The editable draft.
    pub draft: MergeDraft,
    /// Surviving entry as it was when drafted.
    pub target: Skill,
    /// Entries to retire.
    pub losers: Vec<Skill>,
    /// Originating recommendation, if any.
    pub recommendation: Option<RecommendationKey>,
}

/// Outcome of an applied merge.
#[derive(Debug, Clone)]
pub struct MergeReport {
    /// Target as persisted.
    pub target: Skill,
    /// Losers that were deleted.
    pub deleted: Vec<SkillId>,
    /// Losers whose delete failed, with the error.
    pub failed_deletes: Vec<(SkillId, String)>,
    /// True if the fallback content was used.
    pub degraded: bool,
    /// Warning carried over from the draft.
    pub warning: Option<String>,
}

impl MergeReport {
    /// Number of entries that went into the merge, target included.
    #[must_use]
    pub fn merged_count(&self) -> usize {
        1 + self.deleted.len() + self.failed_deletes.len()
    }

    /// Returns a human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Merged {} entries into '{}'",
            self.merged_count(),
            self.target.title
        );
        if !self.failed_deletes.is_empty() {
            summary.push_str(&format!(" ({} delete failures)", self.failed_deletes.len()));
        }
        if self.degraded {
            summary.push_str(" [unreviewed]");
        }
        summary
    }
}

/// Orchestrates merges against an entry store.
pub struct ConsolidationOrchestrator<S: EntryStore> {
    store: S,
    merger: ProvenanceMerger,
}

impl<S: EntryStore> ConsolidationOrchestrator<S> {
    /// Creates an orchestrator with the default merger.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            merger: ProvenanceMerger::new(),
        }
    }

    /// Replaces the merger (e.g. to change the fallback separator).
    #[must_use]
    pub fn with_merger(mut self, merger: ProvenanceMerger) -> Self {
        self.merger = merger;
        self
    }

    /// Returns the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Drafts a merge of `ids`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for fewer than two distinct ids and
    /// [`Error::NotFound`] for ids missing from `state`.
    #[instrument(
        name = "skillvault.consolidation.prepare",
        skip(self, state, ids, summarizer),
        fields(
            request_id = tracing::field::Empty,
            component = "consolidation",
            operation = "prepare",
            requested = ids.len()
        )
    )]
    pub fn prepare(
        &self,
        state: &LibraryState,
        ids: &[SkillId],
        summarizer: &dyn Summarizer,
    ) -> Result<PreparedMerge> {
        record_request_id();
        let ids = dedupe_by_key(ids.iter().cloned(), Clone::clone);
        if ids.len() < 2 {
            return Err(Error::InvalidInput(format!(
                "merge needs at least two distinct entries, got {}",
                ids.len()
            )));
        }
        let entries = ids
            .iter()
            .map(|id| {
                state.get(id).cloned().ok_or_else(|| Error::NotFound {
                    kind: "skill",
                    id: id.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let (target, losers) = select_merge_target(entries)?;
        let draft = self.merger.merge(&target, &losers, summarizer);
        Ok(PreparedMerge {
            draft,
            target,
            losers,
            recommendation: None,
        })
    }

    /// Drafts the merge proposed by an open recommendation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no open recommendation has `key` and
    /// [`Error::InvalidInput`] if it is not a merge recommendation.
    pub fn prepare_recommendation(
        &self,
        state: &LibraryState,
        key: &RecommendationKey,
        summarizer: &dyn Summarizer,
    ) -> Result<PreparedMerge> {
        let recommendation = state
            .open_recommendations()
            .into_iter()
            .find(|r| &r.key() == key)
            .ok_or_else(|| Error::NotFound {
                kind: "recommendation",
                id: key.to_string(),
            })?;
        if !recommendation.is_merge() {
            return Err(Error::InvalidInput(format!(
                "recommendation '{}' is a {} recommendation, not a merge",
                recommendation.title, recommendation.kind
            )));
        }
        let mut prepared = self.prepare(state, &recommendation.affected_entry_ids, summarizer)?;
        prepared.recommendation = Some(key.clone());
        Ok(prepared)
    }

    /// Applies a draft: persist the target, then delete the losers, then
    /// update `state`.
    ///
    /// If persisting the target fails, nothing is deleted, `state` is left
    /// unchanged and the draft stays usable for a retry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the draft is still generating or
    /// does not match `target`/`losers`, or the store error if the target
    /// could not be persisted.
    #[instrument(
        name = "skillvault.consolidation.apply",
        skip(self, state, draft, target, losers, recommendation, actor),
        fields(
            request_id = tracing::field::Empty,
            component = "consolidation",
            operation = "apply",
            target_id = %target.id,
            losers = losers.len()
        )
    )]
    pub fn apply(
        &self,
        state: &mut LibraryState,
        draft: &MergeDraft,
        target: &Skill,
        losers: &[Skill],
        recommendation: Option<&RecommendationKey>,
        actor: &ActingUser,
    ) -> Result<MergeReport> {
        let start = Instant::now();
        record_request_id();
        let result = self.apply_inner(state, draft, target, losers, recommendation, actor);

        let status = match &result {
            Ok(report) if report.failed_deletes.is_empty() => "success",
            Ok(_) => "partial",
            Err(_) => "error",
        };
        metrics::counter!("skillvault_operations_total", "operation" => "merge", "status" => status)
            .increment(1);
        metrics::histogram!("skillvault_operation_duration_ms", "operation" => "merge")
            .record(start.elapsed().as_secs_f64() * 1000.0);

        result
    }

    /// Applies a prepared merge.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub fn apply_prepared(
        &self,
        state: &mut LibraryState,
        prepared: &PreparedMerge,
        actor: &ActingUser,
    ) -> Result<MergeReport> {
        self.apply(
            state,
            &prepared.draft,
            &prepared.target,
            &prepared.losers,
            prepared.recommendation.as_ref(),
            actor,
        )
    }

    fn apply_inner(
        &self,
        state: &mut LibraryState,
        draft: &MergeDraft,
        target: &Skill,
        losers: &[Skill],
        recommendation: Option<&RecommendationKey>,
        actor: &ActingUser,
    ) -> Result<MergeReport> {
        validate_draft(draft, target, losers)?;

        let titles: Vec<&str> = losers.iter().map(|s| s.title.as_str()).collect();
        let patch = SkillPatch {
            title: Some(draft.title.clone()),
            content: Some(draft.content.clone()),
            tags: Some(draft.tags.clone()),
            source_urls: Some(draft.source_urls.clone()),
            owners: Some(draft.owners.clone()),
            history_append: vec![
                HistoryEntry::new(
                    HistoryAction::Merged,
                    format!("Merged with: {}", titles.join(", ")),
                    Utc::now(),
                )
                .by(actor),
            ],
            ..SkillPatch::default()
        };

        let updated = {
            let _span = info_span!("skillvault.consolidation.apply.persist_target").entered();
            self.store.update(&target.id, &patch).inspect_err(|e| {
                tracing::error!(target_id = %target.id, error = %e, "failed to persist merge target; no entries deleted");
            })?
        };

        let mut deleted = Vec::new();
        let mut failed_deletes = Vec::new();
        {
            let _span = info_span!("skillvault.consolidation.apply.delete_losers").entered();
            for loser in losers {
                match self.store.delete(&loser.id) {
                    Ok(()) => {
                        record_event(EntryEvent::Deleted {
                            meta: event_meta("consolidation", actor),
                            skill_id: loser.id.clone(),
                            reason: format!("merged into {}", target.id),
                        });
                        deleted.push(loser.id.clone());
                    },
                    Err(e) => {
                        tracing::warn!(loser_id = %loser.id, error = %e, "failed to delete merged entry");
                        failed_deletes.push((loser.id.clone(), e.to_string()));
                    },
                }
            }
        }

        state.replace_skill(updated.clone());
        state.remove_skills(&deleted);
        state.deselect(&target.id);
        for (id, _) in &failed_deletes {
            state.deselect(id);
        }
        if let Some(key) = recommendation {
            state.mark_resolved(key.clone());
        }

        record_event(EntryEvent::Merged {
            meta: event_meta("consolidation", actor),
            target_id: updated.id.clone(),
            merged_ids: draft.loser_ids.clone(),
            degraded: draft.is_degraded(),
        });
        tracing::info!(
            target_id = %updated.id,
            deleted = deleted.len(),
            failed_deletes = failed_deletes.len(),
            degraded = draft.is_degraded(),
            "merge applied"
        );

        Ok(MergeReport {
            target: updated,
            deleted,
            failed_deletes,
            degraded: draft.is_degraded(),
            warning: draft.warning.clone(),
        })
    }
}

fn validate_draft(draft: &MergeDraft, target: &Skill, losers: &[Skill]) -> Result<()> {
    if draft.is_generating() {
        return Err(Error::InvalidInput(
            "merge content is still generating".to_string(),
        ));
    }
    if losers.is_empty() {
        return Err(Error::InvalidInput(
            "merge needs at least one entry to retire".to_string(),
        ));
    }
    let loser_ids: Vec<&SkillId> = losers.iter().map(|s| &s.id).collect();
    let draft_ids: Vec<&SkillId> = draft.loser_ids.iter().collect();
    if draft.target_id != target.id || loser_ids != draft_ids {
        return Err(Error::InvalidInput(
            "draft does not match the entries being merged".to_string(),
        ));
    }
    if losers.iter().any(|l| l.id == target.id) {
        return Err(Error::InvalidInput(
            "merge target cannot also be retired".to_string(),
        ));
    }
    Ok(())
}

fn record_request_id() {
    if let Some(id) = current_correlation_id() {
        tracing::Span::current().record("request_id", id.as_str());
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::models::{NewSkill, Owner, Priority, RecommendationType};
    use crate::services::provenance::{MergeSource, NoopSummarizer, SummaryOutcome};
    use crate::storage::InMemoryEntryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoSummarizer;

    impl Summarizer for EchoSummarizer {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn summarize(&self, target: &MergeSource, losers: &[MergeSource]) -> SummaryOutcome {
            SummaryOutcome::Ok {
                title: Some(format!("{} (merged)", target.title)),
                content: format!("{} +{}", target.content, losers.len()),
            }
        }
    }

    /// Store whose updates always fail; counts delete calls.
    struct RejectingStore {
        inner: InMemoryEntryStore,
        deletes: AtomicUsize,
    }

    impl EntryStore for RejectingStore {
        fn list(&self) -> Result<Vec<Skill>> {
            self.inner.list()
        }
        fn get(&self, id: &SkillId) -> Result<Option<Skill>> {
            self.inner.get(id)
        }
        fn create(&self, skill: NewSkill) -> Result<Skill> {
            self.inner.create(skill)
        }
        fn import(&self, skill: Skill) -> Result<Skill> {
            self.inner.import(skill)
        }
        fn update(&self, _id: &SkillId, _patch: &SkillPatch) -> Result<Skill> {
            Err(Error::OperationFailed {
                operation: "update".to_string(),
                cause: "disk full".to_string(),
            })
        }
        fn delete(&self, id: &SkillId) -> Result<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(id)
        }
    }

    fn library() -> Vec<Skill> {
        let mut a = Skill::new("a", "Refunds", "short");
        a.tags = vec!["billing".to_string()];
        a.owners = vec![Owner::named("Ana").with_user_id("u1")];
        let mut b = Skill::new("b", "Refund policy", "the longest body of all");
        b.tags = vec!["policy".to_string(), "billing".to_string()];
        let c = Skill::new("c", "Unrelated", "other");
        vec![a, b, c]
    }

    fn ids(raw: &[&str]) -> Vec<SkillId> {
        raw.iter().map(|s| SkillId::new(*s)).collect()
    }

    #[test]
    fn test_prepare_selects_longest_target() {
        let state = LibraryState::new(library());
        let orchestrator = ConsolidationOrchestrator::new(InMemoryEntryStore::new());
        let prepared = orchestrator.prepare(&state, &ids(&["a", "b"]), &EchoSummarizer).unwrap();
        assert_eq!(prepared.target.id.as_str(), "b");
        assert_eq!(prepared.draft.loser_ids, ids(&["a"]));
        assert_eq!(prepared.draft.tags, vec!["policy", "billing"]);
        assert_eq!(prepared.draft.title, "Refund policy (merged)");
    }

    #[test]
    fn test_prepare_validation() {
        let state = LibraryState::new(library());
        let orchestrator = ConsolidationOrchestrator::new(InMemoryEntryStore::new());
        assert!(matches!(
            orchestrator.prepare(&state, &ids(&["a", "a"]), &NoopSummarizer),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            orchestrator.prepare(&state, &ids(&["a", "zzz"]), &NoopSummarizer),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_apply_persists_deletes_and_updates_state() {
        let store = InMemoryEntryStore::with_skills(library());
        let mut state = LibraryState::load(&store).unwrap();
        state.select(SkillId::new("a"));
        state.select(SkillId::new("b"));
        let orchestrator = ConsolidationOrchestrator::new(store);

        let prepared = orchestrator.prepare(&state, &ids(&["a", "b"]), &NoopSummarizer).unwrap();
        let report = orchestrator.apply_prepared(&mut state, &prepared, &ActingUser::with_id("u1"))
            .unwrap();

        assert!(report.degraded);
        assert_eq!(report.deleted, ids(&["a"]));
        assert!(report.summary().ends_with("[unreviewed]"));
        assert_eq!(report.target.owners.len(), 1);
        let last = report.target.history.last().map(|h| h.summary.as_str());
        assert_eq!(last, Some("Merged with: Refunds"));

        let remaining: Vec<_> = state.skills.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(remaining, vec!["b", "c"]);
        assert!(state.selection.is_empty());
        assert_eq!(orchestrator.store().count().unwrap(), 2);
    }

    #[test]
    fn test_target_persist_failure_deletes_nothing() {
        let store = RejectingStore {
            inner: InMemoryEntryStore::with_skills(library()),
            deletes: AtomicUsize::new(0),
        };
        let mut state = LibraryState::new(library());
        let orchestrator = ConsolidationOrchestrator::new(store);
        let prepared = orchestrator.prepare(&state, &ids(&["a", "b", "c"]), &EchoSummarizer).unwrap();

        let result = orchestrator.apply_prepared(&mut state, &prepared, &ActingUser::anonymous());
        assert!(matches!(result, Err(Error::OperationFailed { .. })));
        assert_eq!(orchestrator.store().deletes.load(Ordering::SeqCst), 0);
        assert_eq!(state.skills.len(), 3);
        assert!(prepared.draft.is_ready());
    }

    #[test]
    fn test_apply_rejects_generating_draft() {
        let mut state = LibraryState::new(library());
        let orchestrator = ConsolidationOrchestrator::new(InMemoryEntryStore::with_skills(library()));
        let skills = library();
        let draft = ProvenanceMerger::new().draft(&skills[1], &skills[..1]);
        let result = orchestrator.apply(
            &mut state,
            &draft,
            &skills[1],
            &skills[..1],
            None,
            &ActingUser::anonymous(),
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_apply_rejects_mismatched_draft() {
        let mut state = LibraryState::new(library());
        let orchestrator = ConsolidationOrchestrator::new(InMemoryEntryStore::with_skills(library()));
        let skills = library();
        let draft = ProvenanceMerger::new().merge(&skills[1], &skills[..1], &NoopSummarizer);
        let result = orchestrator.apply(
            &mut state,
            &draft,
            &skills[1],
            &skills[2..],
            None,
            &ActingUser::anonymous(),
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_recommendation_resolved_after_apply() {
        let store = InMemoryEntryStore::with_skills(library());
        let mut state = LibraryState::load(&store).unwrap();
        let merge = Recommendation {
            kind: RecommendationType::Merge,
            priority: Priority::High,
            title: "Duplicate refund entries".to_string(),
            description: String::new(),
            affected_entry_ids: ids(&["b", "a"]),
            suggested_action: None,
        };
        let gap = Recommendation {
            kind: RecommendationType::Gap,
            title: "No shipping entries".to_string(),
            affected_entry_ids: Vec::new(),
            ..merge.clone()
        };
        state.analysis = Some(LibraryAnalysis {
            recommendations: vec![merge.clone(), gap.clone()],
            ..LibraryAnalysis::default()
        });
        let orchestrator = ConsolidationOrchestrator::new(store);

        assert!(matches!(
            orchestrator.prepare_recommendation(&state, &gap.key(), &NoopSummarizer),
            Err(Error::InvalidInput(_))
        ));

        let prepared = orchestrator.prepare_recommendation(&state, &merge.key(), &NoopSummarizer)
            .unwrap();
        assert!(orchestrator
            .apply_prepared(&mut state, &prepared, &ActingUser::anonymous())
            .is_ok());
        let open: Vec<_> = state.open_recommendations().into_iter().map(Recommendation::key).collect();
        assert_eq!(open, vec![gap.key()]);
        assert!(matches!(
            orchestrator.prepare_recommendation(&state, &merge.key(), &NoopSummarizer),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_report_summary_counts_failures() {
        let report = MergeReport {
            target: Skill::new("t", "Target", ""),
            deleted: ids(&["a"]),
            failed_deletes: vec![(SkillId::new("b"), "locked".to_string())],
            degraded: false,
            warning: None,
        };
        assert_eq!(
            report.summary(),
            "Merged 3 entries into 'Target' (1 delete failures)"
        );
    }
}
