//! LLM client abstraction and the collaborators built on it.
//!
//! Providers implement [`LlmProvider`]; the summarizer, library analyzer and
//! source refresher wrap any provider and translate its failures into the
//! tagged outcomes the services expect.

mod analyzer;
mod anthropic;
mod ollama;
pub mod prompts;
mod refresher;
mod summarizer;

pub use analyzer::LlmLibraryAnalyzer;
pub use anthropic::AnthropicClient;
pub use ollama::OllamaClient;
pub use refresher::HttpSourceRefresher;
pub use summarizer::LlmSummarizer;

use crate::config::{LlmConfig, LlmProviderKind};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Trait for LLM providers.
pub trait LlmProvider: Send + Sync {
    /// The provider name.
    fn name(&self) -> &'static str;

    /// Generates a completion for the given prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    fn complete(&self, prompt: &str) -> Result<String>;

    /// Generates a completion with a system prompt.
    ///
    /// Default implementation concatenates system and user prompts.
    /// Providers should override this to use native system prompt support.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    fn complete_with_system(&self, system: &str, user: &str) -> Result<String> {
        let combined = format!("{system}\n\n---\n\nUser message:\n{user}");
        self.complete(&combined)
    }
}

/// HTTP client configuration for LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmHttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for LlmHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

impl LlmHttpConfig {
    /// Loads HTTP configuration from config file settings.
    #[must_use]
    pub fn from_config(config: &LlmConfig) -> Self {
        let defaults = Self::default();
        Self {
            timeout_ms: config.timeout_ms.unwrap_or(defaults.timeout_ms),
            connect_timeout_ms: config
                .connect_timeout_ms
                .unwrap_or(defaults.connect_timeout_ms),
        }
    }
}

/// Builds a blocking HTTP client with configured timeouts.
#[must_use]
pub fn build_http_client(config: LlmHttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build LLM HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Builds the configured provider, or `None` when LLM use is disabled.
#[must_use]
pub fn build_provider(config: &LlmConfig) -> Option<Arc<dyn LlmProvider>> {
    let http = LlmHttpConfig::from_config(config);
    match config.provider {
        LlmProviderKind::None => None,
        LlmProviderKind::Anthropic => {
            let mut client = AnthropicClient::new().with_http_config(http);
            if let Some(key) = &config.api_key {
                client = client.with_api_key(key.clone());
            }
            if let Some(model) = &config.model {
                client = client.with_model(model);
            }
            if let Some(base_url) = &config.base_url {
                client = client.with_endpoint(base_url);
            }
            Some(Arc::new(client))
        },
        LlmProviderKind::Ollama => {
            let mut client = OllamaClient::new().with_http_config(http);
            if let Some(model) = &config.model {
                client = client.with_model(model);
            }
            if let Some(base_url) = &config.base_url {
                client = client.with_endpoint(base_url);
            }
            Some(Arc::new(client))
        },
    }
}

/// Extracts JSON from an LLM response, handling markdown code blocks.
#[must_use]
pub fn extract_json_from_response(response: &str) -> &str {
    let trimmed = response.trim();

    // ```json ... ```
    if let Some(start) = trimmed.find("```json") {
        let json_start = start + 7;
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    // ``` ... ``` without a language marker
    if let Some(start) = trimmed.find("```") {
        let content_start = start + 3;
        let after_marker = &trimmed[content_start..];
        let json_start = after_marker
            .find('{')
            .map_or(content_start, |pos| content_start + pos);
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    // Raw object: first { to last }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return &trimmed[start..=end];
        }
    }

    trimmed
}

/// Escapes XML special characters so entry text cannot break out of the
/// prompt's tags.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}

/// Maps a transport error to a collaborator error, logging its kind.
pub(crate) fn transport_error(provider: &'static str, model: &str, e: &reqwest::Error) -> Error {
    let error_kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_request() {
        "request"
    } else {
        "unknown"
    };
    tracing::error!(
        provider,
        model,
        error = %e,
        error_kind,
        "LLM request failed"
    );
    metrics::counter!("skillvault_llm_errors_total", "provider" => provider, "kind" => error_kind)
        .increment(1);
    Error::Collaborator {
        collaborator: provider,
        cause: format!("{error_kind} error: {e}"),
    }
}

/// Turns a non-success HTTP response into a collaborator error.
pub(crate) fn status_error(
    provider: &'static str,
    model: &str,
    response: reqwest::blocking::Response,
) -> Error {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    tracing::error!(
        provider,
        model,
        status = %status,
        body = %body,
        "LLM API returned error status"
    );
    metrics::counter!("skillvault_llm_errors_total", "provider" => provider, "kind" => "status")
        .increment(1);
    Error::Collaborator {
        collaborator: provider,
        cause: format!("API returned status: {status} - {body}"),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::LlmProvider;
    use crate::{Error, Result};
    use std::sync::Mutex;

    /// Provider returning a canned response and recording prompts.
    pub struct ScriptedProvider {
        response: std::result::Result<String, String>,
        pub prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedProvider {
        pub fn replying(response: &str) -> Self {
            Self {
                response: Ok(response.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(error: &str) -> Self {
            Self {
                response: Err(error.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn last_user_prompt(&self) -> String {
            self.prompts
                .lock()
                .ok()
                .and_then(|p| p.last().map(|(_, user)| user.clone()))
                .unwrap_or_default()
        }
    }

    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn complete(&self, prompt: &str) -> Result<String> {
            self.complete_with_system("", prompt)
        }

        fn complete_with_system(&self, system: &str, user: &str) -> Result<String> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push((system.to_string(), user.to_string()));
            }
            self.response.clone().map_err(|cause| Error::Collaborator {
                collaborator: "scripted",
                cause,
            })
        }
    }
}
