//! Library health analysis.
//!
//! Sends compact previews of the active skills to an analysis collaborator
//! and keeps the returned recommendations in [`LibraryState`]. Only merge
//! recommendations are actionable here; the other kinds are advisory.

use super::consolidation::LibraryState;
use super::event_meta;
use super::identity_merge::dedupe_by_key;
use crate::models::{
    ActingUser, EntryEvent, EntryPreview, LibraryAnalysis, MAX_HEALTH_SCORE, Recommendation, Skill,
    SkillId,
};
use crate::observability::record_event;
use crate::{Error, Result};
use std::collections::HashSet;
use std::time::Instant;
use tracing::instrument;

/// Default number of characters of content sent per entry.
pub const DEFAULT_PREVIEW_CHARS: usize = 500;


/// Tagged result of an analysis attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// The analyzer produced a result.
    Ok(LibraryAnalysis),
    /// The analyzer answered but the answer is unusable.
    Degraded {
        /// Why the answer was rejected.
        reason: String,
    },
    /// The analyzer could not be reached or errored.
    Failed {
        /// Underlying error.
        error: String,
    },
}

/// Analyzes the library as a whole.
pub trait LibraryAnalyzer: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Analyzes `entries`.
    fn analyze(&self, entries: &[EntryPreview]) -> AnalysisOutcome;
}

/// Result of [`AnalysisService::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    /// Entries sent to the analyzer.
    pub entries_analyzed: usize,
    /// Recommendations kept after validation.
    pub recommendations: usize,
    /// Recommendations dropped because they referenced unknown entries.
    pub dropped_recommendations: usize,
    /// Set when the analyzer degraded or failed; the previous analysis is kept.
    pub warning: Option<String>,
}

impl AnalysisReport {
    /// Returns true if the analyzer did not deliver.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.warning.is_some()
    }
}

/// Runs library analysis against explicit state.
#[derive(Debug, Clone)]
pub struct AnalysisService {
    preview_chars: usize,
}

impl Default for AnalysisService {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisService {
    /// Creates a service with the default preview length.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    /// Sets the preview length in characters.
    #[must_use]
    pub const fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    /// Builds previews of the active skills, in library order.
    #[must_use]
    pub fn previews(&self, skills: &[Skill]) -> Vec<EntryPreview> {
        skills
            .iter()
            .filter(|s| s.is_active)
            .map(|s| EntryPreview {
                id: s.id.clone(),
                title: s.title.clone(),
                tags: s.tags.clone(),
                content_preview: truncate_chars(&s.content, self.preview_chars),
            })
            .collect()
    }

    /// Analyzes the active skills in `state` and stores the result.
    ///
    /// A degraded or failed analyzer is not an error: the previous analysis
    /// stays in place and the report carries a warning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the library has no active skills.
    #[instrument(
        name = "skillvault.analysis.run",
        skip(self, state, analyzer, actor),
        fields(
            request_id = tracing::field::Empty,
            component = "analysis",
            operation = "run",
            analyzer = analyzer.name()
        )
    )]
    pub fn run(
        &self,
        state: &mut LibraryState,
        analyzer: &dyn LibraryAnalyzer,
        actor: &ActingUser,
    ) -> Result<AnalysisReport> {
        let start = Instant::now();
        let previews = self.previews(&state.skills);
        if previews.is_empty() {
            return Err(Error::InvalidInput(
                "library has no active entries to analyze".to_string(),
            ));
        }
        let known: HashSet<&SkillId> = previews.iter().map(|p| &p.id).collect();

        let (report, status) = match analyzer.analyze(&previews) {
            AnalysisOutcome::Ok(analysis) => {
                let received = analysis.recommendations.len();
                let analysis = sanitize(analysis, &known);
                let kept = analysis.recommendations.len();
                state.analysis = Some(analysis);
                state.resolved_recommendations.clear();
                let report = AnalysisReport {
                    entries_analyzed: previews.len(),
                    recommendations: kept,
                    dropped_recommendations: received - kept,
                    warning: None,
                };
                (report, "success")
            },
            AnalysisOutcome::Degraded { reason } => (
                unavailable(previews.len(), &format!("analysis unusable: {reason}")),
                "degraded",
            ),
            AnalysisOutcome::Failed { error } => (
                unavailable(previews.len(), &format!("analysis failed: {error}")),
                "failed",
            ),
        };

        if let Some(warning) = &report.warning {
            tracing::warn!(warning = %warning, "library analysis unavailable");
        }
        record_event(EntryEvent::Analyzed {
            meta: event_meta("analysis", actor),
            entries: report.entries_analyzed,
            recommendations: report.recommendations,
            degraded: report.is_degraded(),
        });
        metrics::counter!("skillvault_operations_total", "operation" => "analyze", "status" => status)
            .increment(1);
        metrics::histogram!("skillvault_operation_duration_ms", "operation" => "analyze")
            .record(start.elapsed().as_secs_f64() * 1000.0);

        Ok(report)
    }
}

/// Open merge recommendations, in analyzer order.
#[must_use]
pub fn merge_recommendations(state: &LibraryState) -> Vec<&Recommendation> {
    state
        .open_recommendations()
        .into_iter()
        .filter(|r| r.is_merge())
        .collect()
}

/// First `max_chars` characters of `content`.
#[must_use]
pub fn truncate_chars(content: &str, max_chars: usize) -> String {
    content.chars().take(max_chars).collect()
}

fn unavailable(entries: usize, warning: &str) -> AnalysisReport {
    AnalysisReport {
        entries_analyzed: entries,
        recommendations: 0,
        dropped_recommendations: 0,
        warning: Some(warning.to_string()),
    }
}

/// Drops unknown ids, then merge recommendations left with fewer than two.
fn sanitize(mut analysis: LibraryAnalysis, known: &HashSet<&SkillId>) -> LibraryAnalysis {
    analysis.health_score = analysis.health_score.min(MAX_HEALTH_SCORE);
    analysis.recommendations = analysis
        .recommendations
        .into_iter()
        .filter_map(|mut rec| {
            let had_ids = !rec.affected_entry_ids.is_empty();
            rec.affected_entry_ids = dedupe_by_key(
                rec.affected_entry_ids
                    .into_iter()
                    .filter(|id| known.contains(id)),
                Clone::clone,
            );
            let keep = if rec.is_merge() {
                rec.affected_entry_ids.len() >= 2
            } else {
                !had_ids || !rec.affected_entry_ids.is_empty()
            };
            keep.then_some(rec)
        })
        .collect();
    analysis
}
