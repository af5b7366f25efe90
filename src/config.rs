//! Configuration loading and management.
//!
//! Configuration is loaded from multiple sources with the following precedence
//! (highest to lowest):
//!
//! 1. Command-line arguments (`--model`)
//! 2. Environment variables (a `.env` file in the working directory is loaded
//!    first by the binary)
//! 3. `.sql-agent.toml` in current directory
//! 4. `~/.config/sql-agent/config.toml`
//! 5. Default values
//!
//! Only this module and the binary read the environment. The core receives
//! resolved [`LlmSettings`] and [`StoreTarget`] values.
//!
//! # Configuration File Format
//!
//! ```toml
//! [llm]
//! api_key = "sk-..."           # or use LLM_API_KEY env var
//! api_url = "https://api.openai.com/v1/chat/completions"
//! model = "llama-3.1-8b-instant"
//! timeout_secs = 30
//!
//! [database]
//! url = "sqlite:///./sample.db"
//!
//! [retry]
//! max_retries = 0
//! initial_delay_ms = 1000
//! max_delay_ms = 30000
//! backoff_factor = 2.0
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `LLM_API_KEY` | Bearer token for the model backend (required) |
//! | `LLM_API_URL` | Chat completions endpoint |
//! | `LLM_MODEL` | Model identifier |
//! | `LLM_TIMEOUT_SECS` | HTTP timeout in seconds |
//! | `DATABASE_URL` | Store URL, `sqlite:///<path>` |

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration
};

use serde::Deserialize;

use crate::{
    error::{AgentResult, config_error},
    llm::LlmSettings,
    store::StoreTarget
};

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:///./sample.db";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm:      LlmConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub retry:    RetryConfig
}

/// Model backend configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmConfig {
    pub api_key:      Option<String>,
    pub api_url:      Option<String>,
    pub model:        Option<String>,
    pub timeout_secs: Option<u64>
}

/// Backing store configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DatabaseConfig {
    pub url: Option<String>
}

/// Caller-level retry policy for model requests.
///
/// The generation core is single-shot; the `ask` command applies this
/// around it. Zero retries by default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries:      u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms:     u64,
    pub backoff_factor:   f64
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries:      0,
            initial_delay_ms: 1000,
            max_delay_ms:     30000,
            backoff_factor:   2.0
        }
    }
}

impl Config {
    /// Load configuration from files and the process environment
    pub fn load() -> AgentResult<Self> {
        let home_config = env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("sql-agent")
                .join("config.toml")
        });
        let mut config = Self::from_files(home_config.as_deref(), Path::new(".sql-agent.toml"))?;
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    /// Load from the home config and then the local config, the latter
    /// replacing the former entirely when present.
    pub fn from_files(home: Option<&Path>, local: &Path) -> AgentResult<Self> {
        let mut config = Self::default();
        if let Some(home) = home.filter(|p| p.exists()) {
            config = Self::from_file(home)?;
        }
        if local.exists() {
            config = Self::from_file(local)?;
        }
        Ok(config)
    }

    fn from_file(path: &Path) -> AgentResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| config_error(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parse a TOML document
    pub fn from_toml(content: &str) -> AgentResult<Self> {
        toml::from_str(content).map_err(|e| config_error(format!("Invalid config file: {}", e)))
    }

    /// Override fields with values found through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>
    {
        if let Some(api_key) = lookup("LLM_API_KEY") {
            self.llm.api_key = Some(api_key);
        }
        if let Some(api_url) = lookup("LLM_API_URL") {
            self.llm.api_url = Some(api_url);
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(timeout) = lookup("LLM_TIMEOUT_SECS").and_then(|t| t.parse().ok()) {
            self.llm.timeout_secs = Some(timeout);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
    }

    /// Resolve model backend settings.
    ///
    /// # Errors
    ///
    /// `ConfigurationError` naming `LLM_API_KEY` when no non-empty key is
    /// configured.
    pub fn llm_settings(&self, model_override: Option<String>) -> AgentResult<LlmSettings> {
        let api_key = self
            .llm
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| config_error("Environment variable LLM_API_KEY is required"))?;
        Ok(LlmSettings {
            api_url: self
                .llm
                .api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key,
            model: model_override
                .or_else(|| self.llm.model.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(self.llm.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
        })
    }

    /// Resolve the store target, rejecting non-sqlite URLs.
    pub fn store_target(&self) -> AgentResult<StoreTarget> {
        StoreTarget::parse(self.database.url.as_deref().unwrap_or(DEFAULT_DATABASE_URL))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::AgentError;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::from_toml("[llm]\nmodel = \"from-file\"\n").unwrap();
        config.apply_env(lookup_from(&[("LLM_MODEL", "from-env"), ("LLM_API_KEY", "k")]));
        let settings = config.llm_settings(None).unwrap();
        assert_eq!(settings.model, "from-env");
        assert_eq!(settings.api_key, "k");
    }

    #[test]
    fn test_cli_override_wins() {
        let mut config = Config::default();
        config.apply_env(lookup_from(&[("LLM_MODEL", "env"), ("LLM_API_KEY", "k")]));
        let settings = config.llm_settings(Some("cli".into())).unwrap();
        assert_eq!(settings.model, "cli");
    }

    #[test]
    fn test_defaults_applied() {
        let mut config = Config::default();
        config.apply_env(lookup_from(&[("LLM_API_KEY", "k")]));
        let settings = config.llm_settings(None).unwrap();
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(
            config.store_target().unwrap().path(),
            Path::new("./sample.db")
        );
    }

    #[test]
    fn test_missing_api_key() {
        let err = Config::default().llm_settings(None).unwrap_err();
        assert!(matches!(err, AgentError::ConfigurationError(_)));
        assert!(err.to_string().contains("LLM_API_KEY"));
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let mut config = Config::default();
        config.apply_env(lookup_from(&[("LLM_API_KEY", "  ")]));
        assert!(config.llm_settings(None).is_err());
    }

    #[test]
    fn test_bad_timeout_ignored() {
        let mut config = Config::default();
        config.apply_env(lookup_from(&[("LLM_TIMEOUT_SECS", "soon")]));
        assert!(config.llm.timeout_secs.is_none());
    }

    #[test]
    fn test_unsupported_database_scheme() {
        let mut config = Config::default();
        config.apply_env(lookup_from(&[("DATABASE_URL", "postgres://localhost/app")]));
        assert!(matches!(
            config.store_target(),
            Err(AgentError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_partial_retry_section() {
        let config = Config::from_toml("[retry]\nmax_retries = 2\n").unwrap();
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.initial_delay_ms, 1000);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_toml("[llm\n").is_err());
    }
}
