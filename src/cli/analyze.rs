//! Analyze command.

use super::merge::render_merge_report;
use super::{Workspace, build_analyzer, build_summarizer};
use crate::models::{ActingUser, LibraryAnalysis, RecommendationKey};
use crate::services::{
    AnalysisService, ConsolidationOrchestrator, LibraryAnalyzer, LibraryState, ProvenanceMerger,
};
use crate::{Error, Result};
use std::fmt::Write as _;

/// Analyzes the library and, if `apply` names a merge recommendation from
/// this run, applies it.
///
/// # Errors
///
/// Returns an error if no LLM provider is configured, the library is empty,
/// or the requested recommendation cannot be applied.
pub fn cmd_analyze(
    workspace: &Workspace,
    apply: Option<&RecommendationKey>,
    actor: &ActingUser,
) -> Result<String> {
    let analyzer = build_analyzer(&workspace.config().llm).ok_or_else(|| {
        Error::InvalidInput("analysis needs an LLM provider; set [llm] provider".to_string())
    })?;
    run_analysis(workspace, analyzer.as_ref(), apply, actor)
}

fn run_analysis(
    workspace: &Workspace,
    analyzer: &dyn LibraryAnalyzer,
    apply: Option<&RecommendationKey>,
    actor: &ActingUser,
) -> Result<String> {
    let store = workspace.store();
    let mut state = LibraryState::load(store.as_ref())?;
    let report = AnalysisService::new()
        .with_preview_chars(workspace.config().content_preview_chars)
        .run(&mut state, analyzer, actor)?;

    let mut out = String::new();
    if let Some(warning) = &report.warning {
        let _ = writeln!(out, "Warning: {warning}");
    }
    if let Some(analysis) = &state.analysis {
        render_analysis(&mut out, analysis);
    }
    if report.dropped_recommendations > 0 {
        let _ = writeln!(
            out,
            "{} recommendations dropped (unknown entries)",
            report.dropped_recommendations
        );
    }

    if let Some(key) = apply {
        let summarizer = build_summarizer(&workspace.config().llm);
        let orchestrator = ConsolidationOrchestrator::new(store).with_merger(
            ProvenanceMerger::new().with_separator(workspace.config().merge_separator.clone()),
        );
        let prepared = orchestrator.prepare_recommendation(&state, key, summarizer.as_ref())?;
        let merged = orchestrator.apply_prepared(&mut state, &prepared, actor)?;
        let _ = writeln!(out, "{}", render_merge_report(&merged));
    }
    Ok(out.trim_end().to_string())
}

fn render_analysis(out: &mut String, analysis: &LibraryAnalysis) {
    let _ = writeln!(out, "Health score: {}/100", analysis.health_score);
    if !analysis.summary.is_empty() {
        let _ = writeln!(out, "{}", analysis.summary);
    }
    for rec in &analysis.recommendations {
        let _ = writeln!(out, "[{:?}] {}  {}", rec.priority, rec.key(), rec.title);
        if !rec.description.is_empty() {
            let _ = writeln!(out, "    {}", rec.description);
        }
        if let Some(action) = &rec.suggested_action {
            let _ = writeln!(out, "    -> {action}");
        }
    }
}
