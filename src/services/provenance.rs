//! Provenance merging.
//!
//! Combines a merge target with the skills being retired into a
//! [`MergeDraft`]: tags, source URLs and owners are unioned by identity
//! (target first, first seen wins) and the content comes from a
//! [`Summarizer`], with a deterministic fallback when it cannot deliver.

use super::identity_merge::merge_by_key;
use crate::models::{Owner, Skill, SkillId, SourceUrl};
use crate::{Error, Result};
use std::time::Instant;
use tracing::instrument;

/// Default separator for fallback content.
pub const DEFAULT_SEPARATOR: &str = "\n\n";

/// Title and body handed to a summarizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSource {
    /// Entry title.
    pub title: String,
    /// Entry body.
    pub content: String,
}

impl From<&Skill> for MergeSource {
    fn from(skill: &Skill) -> Self {
        Self {
            title: skill.title.clone(),
            content: skill.content.clone(),
        }
    }
}

/// Tagged result of a summarization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// Usable content. A missing title keeps the target's title.
    Ok {
        /// Suggested title.
        title: Option<String>,
        /// Consolidated body.
        content: String,
    },
    /// The summarizer answered but the answer is unusable.
    Degraded {
        /// Why the answer was rejected.
        reason: String,
    },
    /// The summarizer could not be reached or errored.
    Failed {
        /// Underlying error.
        error: String,
    },
}

/// Produces consolidated content for a merge.
///
/// Implementations never fail the merge: every problem is reported through
/// [`SummaryOutcome`] and the merger falls back.
pub trait Summarizer: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Summarizes `target` and `losers` into one body.
    fn summarize(&self, target: &MergeSource, losers: &[MergeSource]) -> SummaryOutcome;
}

/// Summarizer used when no generator is configured; always degrades.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSummarizer;

impl Summarizer for NoopSummarizer {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn summarize(&self, _target: &MergeSource, _losers: &[MergeSource]) -> SummaryOutcome {
        SummaryOutcome::Degraded {
            reason: "no summarizer configured".to_string(),
        }
    }
}

/// Content status of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftStatus {
    /// Provenance is computed; content is still being generated.
    Generating,
    /// Content came from the summarizer or the user.
    Ready,
    /// Content is the unreviewed fallback.
    Degraded,
}

/// A computed, still editable merge result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeDraft {
    /// Surviving skill.
    pub target_id: SkillId,
    /// Skills to retire, in input order.
    pub loser_ids: Vec<SkillId>,
    /// Merged title.
    pub title: String,
    /// Merged body. Empty while generating.
    pub content: String,
    /// Union of tags.
    pub tags: Vec<String>,
    /// Union of source URLs by normalized URL.
    pub source_urls: Vec<SourceUrl>,
    /// Union of owners by identity key.
    pub owners: Vec<Owner>,
    /// Content status.
    pub status: DraftStatus,
    /// Set when the fallback path was used.
    pub warning: Option<String>,
    fallback_content: String,
}

impl MergeDraft {
    /// Returns true while content is still being generated.
    #[must_use]
    pub fn is_generating(&self) -> bool {
        self.status == DraftStatus::Generating
    }

    /// Returns true if the content is ready to apply.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == DraftStatus::Ready
    }

    /// Returns true if the fallback content is in use.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.status == DraftStatus::Degraded
    }

    /// The deterministic fallback body for this draft.
    #[must_use]
    pub fn fallback_content(&self) -> &str {
        &self.fallback_content
    }

    /// Replaces the title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Replaces the content. A generating draft becomes ready; a degraded one
    /// stays flagged.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        if self.is_generating() {
            self.status = DraftStatus::Ready;
        }
    }

    /// Fills the content from a summarizer outcome.
    pub fn complete(&mut self, outcome: SummaryOutcome) {
        match outcome {
            SummaryOutcome::Ok { title, content } if !content.trim().is_empty() => {
                if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
                    self.title = title;
                }
                self.content = content;
                self.status = DraftStatus::Ready;
                self.warning = None;
            },
            SummaryOutcome::Ok { .. } => self.degrade("summarizer returned empty content"),
            SummaryOutcome::Degraded { reason } => self.degrade(&reason),
            SummaryOutcome::Failed { error } => self.degrade(&format!("summarizer failed: {error}")),
        }
    }

    fn degrade(&mut self, reason: &str) {
        self.content.clone_from(&self.fallback_content);
        self.status = DraftStatus::Degraded;
        self.warning = Some(format!(
            "Content was combined without summarization ({reason}); review before relying on it"
        ));
    }
}

/// Picks the merge target: the longest content wins, ties go to the earliest
/// entry. Losers keep input order.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] with fewer than two entries.
pub fn select_merge_target(mut entries: Vec<Skill>) -> Result<(Skill, Vec<Skill>)> {
    if entries.len() < 2 {
        return Err(Error::InvalidInput(format!(
            "merge needs at least two entries, got {}",
            entries.len()
        )));
    }
    let mut best = 0;
    let mut best_len = entries[0].content_len();
    for (idx, skill) in entries.iter().enumerate().skip(1) {
        let len = skill.content_len();
        if len > best_len {
            best = idx;
            best_len = len;
        }
    }
    let target = entries.remove(best);
    Ok((target, entries))
}

/// Computes merge drafts.
#[derive(Debug, Clone)]
pub struct ProvenanceMerger {
    separator: String,
}

impl Default for ProvenanceMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvenanceMerger {
    /// Creates a merger with the default separator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    /// Sets the fallback separator.
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Computes provenance and leaves the content generating.
    #[must_use]
    pub fn draft(&self, target: &Skill, losers: &[Skill]) -> MergeDraft {
        let all = || std::iter::once(target).chain(losers.iter());

        MergeDraft {
            target_id: target.id.clone(),
            loser_ids: losers.iter().map(|s| s.id.clone()).collect(),
            title: target.title.clone(),
            content: String::new(),
            tags: merge_by_key(all().map(|s| s.tags.iter().cloned()), Clone::clone),
            source_urls: merge_by_key(
                all().map(|s| s.source_urls.iter().cloned()),
                SourceUrl::normalized_key,
            ),
            owners: merge_by_key(all().map(|s| s.owners.iter().cloned()), Owner::identity_key),
            status: DraftStatus::Generating,
            warning: None,
            fallback_content: self.fallback_content(target, losers),
        }
    }

    /// Computes a complete draft, summarizing through `summarizer`.
    #[instrument(
        name = "skillvault.provenance.merge",
        skip(self, target, losers, summarizer),
        fields(
            request_id = tracing::field::Empty,
            component = "provenance",
            operation = "merge",
            target_id = %target.id,
            losers = losers.len(),
            summarizer = summarizer.name()
        )
    )]
    pub fn merge(&self, target: &Skill, losers: &[Skill], summarizer: &dyn Summarizer) -> MergeDraft {
        let start = Instant::now();
        let mut draft = self.draft(target, losers);

        let sources: Vec<MergeSource> = losers.iter().map(MergeSource::from).collect();
        let outcome = summarizer.summarize(&MergeSource::from(target), &sources);
        let status = match &outcome {
            SummaryOutcome::Ok { .. } => "ok",
            SummaryOutcome::Degraded { .. } => "degraded",
            SummaryOutcome::Failed { .. } => "failed",
        };
        draft.complete(outcome);

        if let Some(warning) = &draft.warning {
            tracing::warn!(target_id = %target.id, warning = %warning, "merge draft degraded");
        }
        metrics::counter!("skillvault_summaries_total", "summarizer" => summarizer.name(), "status" => status)
            .increment(1);
        metrics::histogram!("skillvault_operation_duration_ms", "operation" => "summarize")
            .record(start.elapsed().as_secs_f64() * 1000.0);

        draft
    }

    /// Target content, then each loser as a `## title` section.
    fn fallback_content(&self, target: &Skill, losers: &[Skill]) -> String {
        if losers.is_empty() {
            return target.content.clone();
        }
        let sections: Vec<String> = losers
            .iter()
            .map(|l| format!("## {}\n\n{}", l.title, l.content))
            .collect();
        format!(
            "{}{}{}",
            target.content,
            self.separator,
            sections.join(&self.separator)
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::{Duration, Utc};

    struct FixedSummarizer(SummaryOutcome);

    impl Summarizer for FixedSummarizer {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn summarize(&self, _target: &MergeSource, _losers: &[MergeSource]) -> SummaryOutcome {
            self.0.clone()
        }
    }

    fn skill(id: &str, title: &str, content: &str) -> Skill {
        Skill::new(id, title, content)
    }

    #[test]
    fn test_select_target_longest_content() {
        let entries = vec![
            skill("a", "A", &"x".repeat(500)),
            skill("b", "B", &"x".repeat(10)),
            skill("c", "C", &"x".repeat(1000)),
        ];
        let (target, losers) = select_merge_target(entries).unwrap();
        assert_eq!(target.id.as_str(), "c");
        let ids: Vec<_> = losers.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_select_target_tie_goes_to_first() {
        let entries = vec![skill("a", "A", "same"), skill("b", "B", "same")];
        let result = select_merge_target(entries);
        assert_eq!(result.map(|(t, _)| t.id).unwrap(), SkillId::new("a"));
    }

    #[test]
    fn test_select_target_counts_chars_not_bytes() {
        let entries = vec![skill("a", "A", "ééé"), skill("b", "B", "abcd")];
        let result = select_merge_target(entries);
        assert_eq!(result.map(|(t, _)| t.id).unwrap(), SkillId::new("b"));
    }

    #[test]
    fn test_select_target_needs_two() {
        let result = select_merge_target(vec![skill("a", "A", "")]);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_fallback_content_exact() {
        let target = skill("t", "Target", "Target body");
        let losers = vec![skill("a", "First", "one"), skill("b", "Second", "two")];
        let draft = ProvenanceMerger::new().merge(
            &target,
            &losers,
            &FixedSummarizer(SummaryOutcome::Failed {
                error: "timeout".to_string(),
            }),
        );
        assert!(draft.is_degraded());
        assert!(draft.warning.is_some());
        assert_eq!(
            draft.content,
            "Target body\n\n## First\n\none\n\n## Second\n\ntwo"
        );
    }

    #[test]
    fn test_custom_separator() {
        let target = skill("t", "T", "body");
        let losers = vec![skill("a", "A", "x")];
        let draft = ProvenanceMerger::new()
            .with_separator("\n---\n")
            .merge(&target, &losers, &NoopSummarizer);
        assert_eq!(draft.content, "body\n---\n## A\n\nx");
    }

    #[test]
    fn test_summary_ok_keeps_target_title_when_absent() {
        let target = skill("t", "Target", "body");
        let losers = vec![skill("a", "A", "x")];
        let draft = ProvenanceMerger::new().merge(
            &target,
            &losers,
            &FixedSummarizer(SummaryOutcome::Ok {
                title: None,
                content: "merged".to_string(),
            }),
        );
        assert!(draft.is_ready());
        assert_eq!(draft.title, "Target");
        assert_eq!(draft.content, "merged");
        assert!(draft.warning.is_none());
    }

    #[test]
    fn test_empty_summary_degrades() {
        let target = skill("t", "Target", "body");
        let losers = vec![skill("a", "A", "x")];
        let draft = ProvenanceMerger::new().merge(
            &target,
            &losers,
            &FixedSummarizer(SummaryOutcome::Ok {
                title: Some("New".to_string()),
                content: "  ".to_string(),
            }),
        );
        assert!(draft.is_degraded());
        assert_eq!(draft.title, "Target");
    }

    #[test]
    fn test_provenance_union() {
        let now = Utc::now();
        let mut target = skill("t", "T", "body");
        target.tags = vec!["x".to_string(), "Y".to_string()];
        target.source_urls = vec![SourceUrl::new("https://a.com/", now)];
        target.owners = vec![Owner::named("Ana").with_user_id("u1")];

        let mut loser = skill("l", "L", "x");
        loser.tags = vec!["Y".to_string(), "z".to_string()];
        loser.source_urls = vec![
            SourceUrl::new("HTTPS://A.COM", now + Duration::days(1)),
            SourceUrl::new("https://b.com", now),
        ];
        loser.owners = vec![Owner::named("ana").with_user_id("u1"), Owner::named("Bob")];

        let draft = ProvenanceMerger::new().draft(&target, &[loser]);
        assert!(draft.is_generating());
        assert!(draft.content.is_empty());
        assert_eq!(draft.tags, vec!["x", "Y", "z"]);
        assert_eq!(draft.source_urls.len(), 2);
        assert_eq!(draft.source_urls[0].added_at, now);
        assert_eq!(draft.owners.len(), 2);
        assert_eq!(draft.owners[0].name, "Ana");
    }

    #[test]
    fn test_url_variants_collapse_to_target_record() {
        let added = Utc::now() - Duration::days(90);
        let mut target = skill("t", "T", "body");
        target.source_urls = vec![SourceUrl::new("https://a.com/", added)];

        let mut first = skill("l1", "L1", "x");
        first.source_urls = vec![SourceUrl::new("https://a.com", Utc::now())];
        let mut second = skill("l2", "L2", "y");
        second.source_urls = vec![SourceUrl::new("HTTPS://A.COM/", Utc::now())];

        let draft = ProvenanceMerger::new().draft(&target, &[first, second]);
        assert_eq!(draft.source_urls.len(), 1);
        assert_eq!(draft.source_urls[0].url, "https://a.com/");
        assert_eq!(draft.source_urls[0].added_at, added);
    }

    #[test]
    fn test_set_content_finishes_generating_draft() {
        let target = skill("t", "T", "body");
        let mut draft = ProvenanceMerger::new().draft(&target, &[skill("a", "A", "x")]);
        draft.set_content("hand written");
        assert!(draft.is_ready());

        draft.complete(SummaryOutcome::Degraded {
            reason: "bad json".to_string(),
        });
        draft.set_content("edited fallback");
        assert!(draft.is_degraded());
        assert_eq!(draft.content, "edited fallback");
    }
}
