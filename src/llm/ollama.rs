//! Ollama (local) client.

use super::{LlmHttpConfig, LlmProvider, build_http_client, status_error, transport_error};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Ollama local LLM client.
pub struct OllamaClient {
    /// API endpoint.
    endpoint: String,
    /// Model to use.
    model: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl OllamaClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:11434";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "llama3.2";

    /// Creates a new Ollama client, honoring `OLLAMA_HOST` and `OLLAMA_MODEL`.
    #[must_use]
    pub fn new() -> Self {
        let endpoint = std::env::var("OLLAMA_HOST")
            .unwrap_or_else(|_| Self::DEFAULT_ENDPOINT.to_string());
        let model =
            std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| Self::DEFAULT_MODEL.to_string());

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model,
            client: build_http_client(LlmHttpConfig::default()),
        }
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

    /// Checks if the Ollama server is reachable.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.endpoint))
            .send()
            .is_ok_and(|r| r.status().is_success())
    }

    fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        tracing::info!(provider = "ollama", model = %self.model, "Making LLM request");

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.endpoint))
            .json(&request)
            .send()
            .map_err(|e| transport_error("ollama", &self.model, &e))?;

        if !response.status().is_success() {
            return Err(status_error("ollama", &self.model, response));
        }

        let response: ChatResponse = response.json().map_err(|e| Error::Collaborator {
            collaborator: "ollama",
            cause: format!("failed to parse response: {e}"),
        })?;
        Ok(response.message.content)
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmProvider for OllamaClient {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        self.chat(vec![ChatMessage::new("user", prompt)])
    }

    fn complete_with_system(&self, system: &str, user: &str) -> Result<String> {
        self.chat(vec![
            ChatMessage::new("system", system),
            ChatMessage::new("user", user),
        ])
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_builders() {
        let client = OllamaClient::new()
            .with_endpoint("http://gpu-box:11434/")
            .with_model("mistral");
        assert_eq!(client.endpoint, "http://gpu-box:11434");
        assert_eq!(client.model, "mistral");
        assert_eq!(client.name(), "ollama");
    }

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "llama3.2".to_string(),
            messages: vec![ChatMessage::new("system", "s"), ChatMessage::new("user", "u")],
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][1]["content"], "u");
    }

    #[test]
    fn test_chat_response_parses() {
        let raw = r#"{"model":"llama3.2","message":{"role":"assistant","content":"done"},"done":true}"#;
        let parsed: std::result::Result<ChatResponse, _> = serde_json::from_str(raw);
        assert_eq!(parsed.map(|r| r.message.content).ok().as_deref(), Some("done"));
    }
}
