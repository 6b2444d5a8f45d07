//! LLM-backed merge summarizer.

use super::prompts::MERGE_SUMMARY_PROMPT;
use super::{LlmProvider, escape_xml, extract_json_from_response};
use crate::services::{MergeSource, Summarizer, SummaryOutcome};
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;

/// Consolidates merge sources with an LLM.
pub struct LlmSummarizer {
    provider: Arc<dyn LlmProvider>,
}

impl LlmSummarizer {
    /// Creates a summarizer over `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: String,
}

impl Summarizer for LlmSummarizer {
    fn name(&self) -> &'static str {
        self.provider.name()
    }

    fn summarize(&self, target: &MergeSource, losers: &[MergeSource]) -> SummaryOutcome {
        let prompt = build_prompt(target, losers);
        let response = match self
            .provider
            .complete_with_system(MERGE_SUMMARY_PROMPT, &prompt)
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(provider = self.provider.name(), error = %e, "summarization failed");
                return SummaryOutcome::Failed {
                    error: e.to_string(),
                };
            },
        };
        parse_response(&response)
    }
}

fn build_prompt(target: &MergeSource, losers: &[MergeSource]) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "<target>\n<title>{}</title>\n<content>{}</content>\n</target>",
        escape_xml(&target.title),
        escape_xml(&target.content)
    );
    for loser in losers {
        let _ = writeln!(
            prompt,
            "<entry>\n<title>{}</title>\n<content>{}</content>\n</entry>",
            escape_xml(&loser.title),
            escape_xml(&loser.content)
        );
    }
    prompt
}

fn parse_response(response: &str) -> SummaryOutcome {
    let json = extract_json_from_response(response);
    match serde_json::from_str::<SummaryResponse>(json) {
        Ok(parsed) if !parsed.content.trim().is_empty() => SummaryOutcome::Ok {
            title: parsed.title.filter(|t| !t.trim().is_empty()),
            content: parsed.content,
        },
        Ok(_) => SummaryOutcome::Degraded {
            reason: "summary content was empty".to_string(),
        },
        Err(e) => SummaryOutcome::Degraded {
            reason: format!("unparsable summary: {e}"),
        },
    }
}
