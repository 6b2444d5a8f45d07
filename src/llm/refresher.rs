//! Refresh-from-source over HTTP plus an LLM.

use super::prompts::SOURCE_REFRESH_PROMPT;
use super::{
    LlmHttpConfig, LlmProvider, build_http_client, escape_xml, extract_json_from_response,
};
use crate::models::Skill;
use crate::services::{SourceRefresher, truncate_chars};
use crate::{Error, Result};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::fmt::Write as _;
use std::io::Read;
use std::sync::Arc;

/// Default number of characters kept per fetched source.
pub const DEFAULT_MAX_SOURCE_CHARS: usize = 20_000;

/// Bytes downloaded per kept character, leaving room for markup.
const FETCH_BYTES_PER_CHAR: u64 = 8;

/// Markup stripped from fetched pages, applied in order.
static MARKUP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").ok(),
        Regex::new(r"(?s)<!--.*?-->").ok(),
        Regex::new(r"(?s)<[^>]+>").ok(),
    ]
    .into_iter()
    .flatten()
    .collect()
});

/// Fetches a skill's source URLs and asks an LLM to rewrite it.
pub struct HttpSourceRefresher {
    provider: Arc<dyn LlmProvider>,
    client: reqwest::blocking::Client,
    max_source_chars: usize,
}

impl HttpSourceRefresher {
    /// Creates a refresher with default HTTP timeouts.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            client: build_http_client(LlmHttpConfig::default()),
            max_source_chars: DEFAULT_MAX_SOURCE_CHARS,
        }
    }

    /// Sets HTTP client timeouts for source fetches.
    #[must_use]
    pub fn with_http_config(mut self, config: LlmHttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Sets how much of each source is sent to the model.
    #[must_use]
    pub const fn with_max_source_chars(mut self, max: usize) -> Self {
        self.max_source_chars = max;
        self
    }

    fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().map_err(|e| Error::Collaborator {
            collaborator: "source_fetch",
            cause: format!("{url}: {e}"),
        })?;
        if !response.status().is_success() {
            return Err(Error::Collaborator {
                collaborator: "source_fetch",
                cause: format!("{url}: status {}", response.status()),
            });
        }
        let budget = u64::try_from(self.max_source_chars)
            .unwrap_or(u64::MAX)
            .saturating_mul(FETCH_BYTES_PER_CHAR);
        if response.content_length().is_some_and(|len| len > budget) {
            tracing::debug!(url, budget, "source larger than fetch budget, truncating");
        }
        let body = read_capped(response, budget).map_err(|e| Error::Collaborator {
            collaborator: "source_fetch",
            cause: format!("{url}: {e}"),
        })?;
        Ok(truncate_chars(&html_to_text(&body), self.max_source_chars))
    }

    /// Rewrites `skill` from already fetched `(url, text)` pairs.
    pub(crate) fn regenerate(&self, skill: &Skill, sources: &[(String, String)]) -> Result<Skill> {
        let prompt = build_prompt(skill, sources);
        let response = self
            .provider
            .complete_with_system(SOURCE_REFRESH_PROMPT, &prompt)?;
        let json = extract_json_from_response(&response);
        let parsed: RefreshResponse =
            serde_json::from_str(json).map_err(|e| Error::Collaborator {
                collaborator: self.provider.name(),
                cause: format!("unparsable refresh: {e}"),
            })?;
        if parsed.content.trim().is_empty() {
            return Err(Error::Collaborator {
                collaborator: self.provider.name(),
                cause: "refreshed content was empty".to_string(),
            });
        }

        let now = Utc::now();
        let mut refreshed = skill.clone();
        if let Some(title) = parsed.title.filter(|t| !t.trim().is_empty()) {
            refreshed.title = title;
        }
        refreshed.content = parsed.content;
        if let Some(tags) = parsed.tags.filter(|t| !t.is_empty()) {
            refreshed.tags = tags;
        }
        for source in &mut refreshed.source_urls {
            if sources.iter().any(|(url, _)| url == &source.url) {
                source.last_fetched_at = Some(now);
            }
        }
        Ok(refreshed)
    }
}

/// Reads at most `limit` bytes of `reader` as lossy UTF-8.
fn read_capped(reader: impl Read, limit: u64) -> std::io::Result<String> {
    let mut bytes = Vec::new();
    reader.take(limit).read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

impl SourceRefresher for HttpSourceRefresher {
    fn name(&self) -> &'static str {
        "http"
    }

    fn refresh_from_source(&self, skill: &Skill) -> Result<Skill> {
        if skill.source_urls.is_empty() {
            return Err(Error::InvalidInput(format!(
                "skill {} has no source URLs",
                skill.id
            )));
        }

        let mut fetched = Vec::with_capacity(skill.source_urls.len());
        let mut last_error = None;
        for source in &skill.source_urls {
            match self.fetch(&source.url) {
                Ok(text) => fetched.push((source.url.clone(), text)),
                Err(e) => {
                    tracing::warn!(skill_id = %skill.id, url = %source.url, error = %e, "source fetch failed");
                    last_error = Some(e);
                },
            }
        }
        if fetched.is_empty() {
            return Err(last_error.unwrap_or_else(|| Error::Collaborator {
                collaborator: "source_fetch",
                cause: "no sources fetched".to_string(),
            }));
        }

        tracing::debug!(skill_id = %skill.id, sources = fetched.len(), "regenerating from sources");
        self.regenerate(skill, &fetched)
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

fn build_prompt(skill: &Skill, sources: &[(String, String)]) -> String {
    let mut prompt = format!(
        "<entry>\n<title>{}</title>\n<tags>{}</tags>\n<content>{}</content>\n</entry>\n",
        escape_xml(&skill.title),
        escape_xml(&skill.tags.join(", ")),
        escape_xml(&skill.content)
    );
    for (url, text) in sources {
        let _ = writeln!(
            prompt,
            "<source url=\"{}\">{}</source>",
            escape_xml(url),
            escape_xml(text)
        );
    }
    prompt
}

/// Reduces an HTML page to its visible text. Plain text passes through.
fn html_to_text(body: &str) -> String {
    let mut text = body.to_string();
    for re in MARKUP_PATTERNS.iter() {
        text = re.replace_all(&text, " ").into_owned();
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
