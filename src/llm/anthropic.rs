//! Anthropic Claude client.

use super::{LlmHttpConfig, LlmProvider, build_http_client, status_error, transport_error};
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Anthropic Claude LLM client.
pub struct AnthropicClient {
    /// API key. Never logged.
    api_key: Option<SecretString>,
    /// API endpoint.
    endpoint: String,
    /// Model to use.
    model: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl AnthropicClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.anthropic.com/v1";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "claude-3-5-haiku-latest";

    const API_VERSION: &'static str = "2023-06-01";
    const MAX_TOKENS: u32 = 4096;

    /// Creates a new Anthropic client, reading the key from `ANTHROPIC_API_KEY`.
    #[must_use]
    pub fn new() -> Self {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);
        Self {
            api_key,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            client: build_http_client(LlmHttpConfig::default()),
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: SecretString) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets HTTP client timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: LlmHttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Validates that the client is configured with a plausible key.
    ///
    /// Keys start with `sk-ant-` and are at least 40 characters long.
    fn validate(&self) -> Result<&str> {
        let key = self
            .api_key
            .as_ref()
            .map(|k| k.expose_secret())
            .ok_or_else(|| Error::Collaborator {
                collaborator: "anthropic",
                cause: "ANTHROPIC_API_KEY not set".to_string(),
            })?;
        if !key.starts_with("sk-ant-") || key.len() < 40 {
            tracing::warn!("Invalid Anthropic API key format");
            return Err(Error::Collaborator {
                collaborator: "anthropic",
                cause: "invalid API key format".to_string(),
            });
        }
        Ok(key)
    }

    fn request(&self, system: Option<&str>, messages: Vec<Message>) -> Result<String> {
        let api_key = self.validate()?;

        tracing::info!(provider = "anthropic", model = %self.model, "Making LLM request");

        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: Self::MAX_TOKENS,
            system: system.map(str::to_string),
            messages,
        };

        let response = self
            .client
            .post(format!("{}/messages", self.endpoint))
            .header("x-api-key", api_key)
            .header("anthropic-version", Self::API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .map_err(|e| transport_error("anthropic", &self.model, &e))?;

        if !response.status().is_success() {
            return Err(status_error("anthropic", &self.model, response));
        }

        let response: MessagesResponse = response.json().map_err(|e| Error::Collaborator {
            collaborator: "anthropic",
            cause: format!("failed to parse response: {e}"),
        })?;

        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(Error::Collaborator {
                collaborator: "anthropic",
                cause: "response contained no text".to_string(),
            });
        }
        Ok(text)
    }
}

impl Default for AnthropicClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmProvider for AnthropicClient {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        self.request(None, vec![Message::user(prompt)])
    }

    fn complete_with_system(&self, system: &str, user: &str) -> Result<String> {
        self.request(Some(system), vec![Message::user(user)])
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

impl Message {
    fn user(content: &str) -> Self {
        Self {
            role: "user",
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}
