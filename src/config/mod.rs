//! Configuration management.
//!
//! Configuration is read from a TOML file (see [`ConfigFile`]), then
//! environment overrides are applied. `${VAR}` references inside string
//! values are expanded from the environment.

use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default number of characters of content sent to the analyzer per entry.
pub const DEFAULT_CONTENT_PREVIEW_CHARS: usize = 500;

/// Default separator between sections of fallback merge content.
pub const DEFAULT_MERGE_SEPARATOR: &str = "\n\n";

static ENV_VAR_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").ok());

/// Main configuration for skillvault.
#[derive(Debug, Clone)]
pub struct SkillVaultConfig {
    /// Path to the `SQLite` entry store. `None` uses an in-memory store.
    pub db_path: Option<PathBuf>,
    /// Category names in registry order.
    pub categories: Vec<String>,
    /// Characters of content included in analysis previews.
    pub content_preview_chars: usize,
    /// Separator used by the fallback merge content.
    pub merge_separator: String,
    /// LLM provider configuration.
    pub llm: LlmConfig,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    /// Which provider to use.
    pub provider: LlmProviderKind,
    /// Model name.
    pub model: Option<String>,
    /// API key, after `${VAR}` expansion.
    pub api_key: Option<SecretString>,
    /// Base URL for the provider (for self-hosted).
    pub base_url: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
}

/// Available LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProviderKind {
    /// Anthropic Claude.
    #[default]
    Anthropic,
    /// Ollama (local).
    Ollama,
    /// No LLM: merges always take the fallback path.
    None,
}

impl LlmProviderKind {
    /// Parses a provider string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "ollama" => Self::Ollama,
            "none" | "off" | "disabled" => Self::None,
            _ => Self::Anthropic,
        }
    }
}

/// Logging settings as configured (before env overrides).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Default filter directive, e.g. `info` or `skillvault=debug`.
    pub level: Option<String>,
    /// Log file path; stderr when unset.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Entry store path.
    pub db_path: Option<String>,
    /// Category order.
    pub categories: Option<Vec<String>>,
    /// Analysis preview length.
    pub content_preview_chars: Option<usize>,
    /// Fallback merge separator.
    pub merge_separator: Option<String>,
    /// LLM configuration.
    pub llm: Option<ConfigFileLlm>,
    /// Logging configuration.
    pub logging: Option<ConfigFileLogging>,
}

/// LLM section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLlm {
    /// Provider name.
    pub provider: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// API key (may be `${ENV_VAR}`).
    pub api_key: Option<String>,
    /// Base URL.
    pub base_url: Option<String>,
    /// Request timeout.
    pub timeout_ms: Option<u64>,
    /// Connect timeout.
    pub connect_timeout_ms: Option<u64>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Filter directive.
    pub level: Option<String>,
    /// Log file.
    pub file: Option<String>,
}

impl Default for SkillVaultConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            categories: Vec::new(),
            content_preview_chars: DEFAULT_CONTENT_PREVIEW_CHARS,
            merge_separator: DEFAULT_MERGE_SEPARATOR.to_string(),
            llm: LlmConfig::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl SkillVaultConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;
        Self::parse_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration.
    pub fn parse_toml(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;
        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/skillvault/` on macOS)
    /// 2. XDG config dir (`~/.config/skillvault/`)
    ///
    /// Returns default configuration if no config file is found. A file that
    /// exists but fails to parse is logged and skipped.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("skillvault").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("skillvault")
                .join("config.toml"),
        ];
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Ignoring config file"),
            }
        }

        Self::default()
    }

    /// The configured database path, or `skillvault.db` under the platform
    /// data directory. `None` only when no home directory can be found.
    #[must_use]
    pub fn effective_db_path(&self) -> Option<PathBuf> {
        self.db_path.clone().or_else(|| {
            directories::BaseDirs::new()
                .map(|d| d.data_local_dir().join("skillvault").join("skillvault.db"))
        })
    }

    /// Builds configuration from a parsed file.
    #[must_use]
    pub fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(db_path) = file.db_path {
            config.db_path = Some(PathBuf::from(expand_env_vars(&db_path)));
        }
        if let Some(categories) = file.categories {
            config.categories = categories;
        }
        if let Some(chars) = file.content_preview_chars {
            config.content_preview_chars = chars;
        }
        if let Some(separator) = file.merge_separator {
            config.merge_separator = separator;
        }
        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                config.llm.provider = LlmProviderKind::parse(&provider);
            }
            config.llm.model = llm.model;
            config.llm.api_key = llm
                .api_key
                .map(|key| expand_env_vars(&key))
                .filter(|key| !key.is_empty())
                .map(SecretString::from);
            config.llm.base_url = llm.base_url.map(|url| expand_env_vars(&url));
            config.llm.timeout_ms = llm.timeout_ms;
            config.llm.connect_timeout_ms = llm.connect_timeout_ms;
        }
        if let Some(logging) = file.logging {
            config.logging = LoggingSettings {
                format: logging.format,
                level: logging.level,
                file: logging.file.map(|f| PathBuf::from(expand_env_vars(&f))),
            };
        }

        config
    }

    /// Applies `SKILLVAULT_*` environment overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary lookup (the environment in production).
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup("SKILLVAULT_DB_PATH").filter(|v| !v.is_empty()) {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Some(categories) = lookup("SKILLVAULT_CATEGORIES") {
            self.categories = categories
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(provider) = lookup("SKILLVAULT_LLM_PROVIDER") {
            self.llm.provider = LlmProviderKind::parse(&provider);
        }
        if let Some(model) = lookup("SKILLVAULT_LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(timeout) = lookup("SKILLVAULT_LLM_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.llm.timeout_ms = Some(timeout);
        }
        self
    }
}

/// Expands `${VAR}` references from the environment. Unset variables expand
/// to the empty string.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    expand_with(value, |key| std::env::var(key).ok())
}

fn expand_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let Some(pattern) = ENV_VAR_PATTERN.as_ref() else {
        return value.to_string();
    };
    pattern
        .replace_all(value, |caps: &regex::Captures<'_>| {
            lookup(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}
