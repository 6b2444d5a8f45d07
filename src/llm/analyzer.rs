//! LLM-backed library analyzer.

use super::prompts::LIBRARY_ANALYSIS_PROMPT;
use super::{LlmProvider, escape_xml, extract_json_from_response};
use crate::models::{EntryPreview, LibraryAnalysis};
use crate::services::{AnalysisOutcome, LibraryAnalyzer};
use std::sync::Arc;

/// Asks an LLM to review the whole library.
pub struct LlmLibraryAnalyzer {
    provider: Arc<dyn LlmProvider>,
}

impl LlmLibraryAnalyzer {
    /// Creates an analyzer over `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

impl LibraryAnalyzer for LlmLibraryAnalyzer {
    fn name(&self) -> &'static str {
        self.provider.name()
    }

    fn analyze(&self, entries: &[EntryPreview]) -> AnalysisOutcome {
        let escaped: Vec<EntryPreview> = entries.iter().map(escape_preview).collect();
        let payload = match serde_json::to_string(&escaped) {
            Ok(payload) => payload,
            Err(e) => {
                return AnalysisOutcome::Failed {
                    error: format!("failed to encode previews: {e}"),
                };
            },
        };
        let prompt = format!("<entries>{payload}</entries>");

        match self
            .provider
            .complete_with_system(LIBRARY_ANALYSIS_PROMPT, &prompt)
        {
            Ok(response) => parse_response(&response),
            Err(e) => {
                tracing::warn!(provider = self.provider.name(), error = %e, "library analysis failed");
                AnalysisOutcome::Failed {
                    error: e.to_string(),
                }
            },
        }
    }
}

// Field text is escaped; the JSON structure itself stays readable.
fn escape_preview(preview: &EntryPreview) -> EntryPreview {
    EntryPreview {
        id: preview.id.clone(),
        title: escape_xml(&preview.title),
        tags: preview.tags.iter().map(|t| escape_xml(t)).collect(),
        content_preview: escape_xml(&preview.content_preview),
    }
}

fn parse_response(response: &str) -> AnalysisOutcome {
    let json = extract_json_from_response(response);
    match serde_json::from_str::<LibraryAnalysis>(json) {
        Ok(analysis) => AnalysisOutcome::Ok(analysis),
        Err(e) => AnalysisOutcome::Degraded {
            reason: format!("unparsable analysis: {e}"),
        },
    }
}
