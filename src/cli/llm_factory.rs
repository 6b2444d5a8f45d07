//! Collaborator factories for CLI commands.
//!
//! Builds the summarizer, analyzer and refresher from the LLM configuration.

use crate::config::LlmConfig;
use crate::llm::{
    HttpSourceRefresher, LlmHttpConfig, LlmLibraryAnalyzer, LlmSummarizer, build_provider,
};
use crate::services::{LibraryAnalyzer, NoopSummarizer, SourceRefresher, Summarizer};

/// Builds the merge summarizer. Without a provider every merge uses the
/// deterministic fallback content.
#[must_use]
pub fn build_summarizer(llm_config: &LlmConfig) -> Box<dyn Summarizer> {
    match build_provider(llm_config) {
        Some(provider) => Box::new(LlmSummarizer::new(provider)),
        None => Box::new(NoopSummarizer),
    }
}

/// Builds the library analyzer, if a provider is configured.
#[must_use]
pub fn build_analyzer(llm_config: &LlmConfig) -> Option<Box<dyn LibraryAnalyzer>> {
    build_provider(llm_config)
        .map(|provider| Box::new(LlmLibraryAnalyzer::new(provider)) as Box<dyn LibraryAnalyzer>)
}

/// Builds the source refresher, if a provider is configured.
#[must_use]
pub fn build_refresher(llm_config: &LlmConfig) -> Option<Box<dyn SourceRefresher>> {
    build_provider(llm_config).map(|provider| {
        Box::new(
            HttpSourceRefresher::new(provider)
                .with_http_config(LlmHttpConfig::from_config(llm_config)),
        ) as Box<dyn SourceRefresher>
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmProviderKind;

    fn disabled() -> LlmConfig {
        LlmConfig {
            provider: LlmProviderKind::None,
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_disabled_provider_falls_back() {
        let config = disabled();
        assert_eq!(build_summarizer(&config).name(), "noop");
        assert!(build_analyzer(&config).is_none());
        assert!(build_refresher(&config).is_none());
    }

    #[test]
    fn test_ollama_provider_builds_collaborators() {
        let config = LlmConfig {
            provider: LlmProviderKind::Ollama,
            ..LlmConfig::default()
        };
        assert_eq!(build_summarizer(&config).name(), "ollama");
        assert!(build_analyzer(&config).is_some());
        assert_eq!(build_refresher(&config).map(|r| r.name()), Some("http"));
    }
}
