//! Configuration management for llmq
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{LlmqError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for llmq
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Where the login session is kept between runs
    #[serde(default)]
    pub session: SessionConfig,
    /// Chat behavior settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Origin and prefix of the REST API, e.g. `http://localhost:8000/api/v1`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds. Unset means the HTTP client default.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: None,
        }
    }
}

/// Session persistence backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    /// JSON file in the user's data directory (or `session.path`)
    #[default]
    File,
    /// OS credential store
    Keyring,
    /// Kept in memory only; nothing survives the process
    Memory,
}

impl SessionBackend {
    /// Parse a backend name (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use llmq::config::SessionBackend;
    ///
    /// assert_eq!(SessionBackend::parse_str("Keyring").unwrap(), SessionBackend::Keyring);
    /// assert!(SessionBackend::parse_str("redis").is_err());
    /// ```
    pub fn parse_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keyring" => Ok(Self::Keyring),
            "memory" => Ok(Self::Memory),
            other => Err(format!("Unknown session backend: {}", other)),
        }
    }
}

/// Session persistence configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Which store holds the token and username
    #[serde(default)]
    pub backend: SessionBackend,

    /// Explicit session file path for the `file` backend
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Chat behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Refresh usage stats after every successful query
    #[serde(default = "default_refresh_stats")]
    pub refresh_stats_after_query: bool,

    /// `limit` sent with history requests. Unset lets the server decide.
    #[serde(default)]
    pub history_limit: Option<u32>,
}

fn default_refresh_stats() -> bool {
    true
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            refresh_stats_after_query: default_refresh_stats(),
            history_limit: None,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LlmqError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| LlmqError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("LLMQ_API_BASE_URL") {
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("LLMQ_API_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = Some(value);
            } else {
                tracing::warn!("Invalid LLMQ_API_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(backend) = std::env::var("LLMQ_SESSION_BACKEND") {
            match SessionBackend::parse_str(&backend) {
                Ok(value) => self.session.backend = value,
                Err(e) => tracing::warn!("{}, keeping {:?}", e, self.session.backend),
            }
        }

        if let Ok(path) = std::env::var("LLMQ_SESSION_PATH") {
            self.session.path = Some(PathBuf::from(path));
        }

        if let Ok(limit) = std::env::var("LLMQ_HISTORY_LIMIT") {
            if let Ok(value) = limit.parse() {
                self.chat.history_limit = Some(value);
            } else {
                tracing::warn!("Invalid LLMQ_HISTORY_LIMIT: {}", limit);
            }
        }

        if let Ok(refresh) = std::env::var("LLMQ_REFRESH_STATS") {
            match refresh.parse::<bool>() {
                Ok(v) => self.chat.refresh_stats_after_query = v,
                Err(_) => tracing::warn!("Invalid value for LLMQ_REFRESH_STATS: {}", refresh),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(base_url) = &cli.base_url {
            tracing::debug!(base_url = %base_url, "CLI override: --base-url");
            self.api.base_url = base_url.clone();
        }
        if let Some(backend) = cli.session_backend {
            tracing::debug!(?backend, "CLI override: --session-backend");
            self.session.backend = backend;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is not an absolute http(s) URL or a
    /// numeric setting is zero
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api.base_url).map_err(|e| {
            LlmqError::Config(format!("Invalid api.base_url {}: {}", self.api.base_url, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(LlmqError::Config(format!(
                "api.base_url must use http or https, got {}",
                url.scheme()
            ))
            .into());
        }

        if self.api.timeout_seconds == Some(0) {
            return Err(
                LlmqError::Config("api.timeout_seconds must be greater than 0".to_string()).into(),
            );
        }

        if self.chat.history_limit == Some(0) {
            return Err(
                LlmqError::Config("chat.history_limit must be greater than 0".to_string()).into(),
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000/api/v1");
        assert_eq!(config.api.timeout_seconds, None);
        assert_eq!(config.session.backend, SessionBackend::File);
        assert!(config.chat.refresh_stats_after_query);
        assert!(config.chat.history_limit.is_none());
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_non_http_scheme() {
        let mut config = Config::default();
        config.api.base_url = "ftp://example.com/api".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = Config::default();
        config.api.timeout_seconds = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_history_limit() {
        let mut config = Config::default();
        config.chat.history_limit = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
api:
  base_url: https://llm.example.com/api/v1
  timeout_seconds: 60
session:
  backend: memory
chat:
  refresh_stats_after_query: false
  history_limit: 25
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.api.base_url, "https://llm.example.com/api/v1");
        assert_eq!(config.api.timeout_seconds, Some(60));
        assert_eq!(config.session.backend, SessionBackend::Memory);
        assert!(!config.chat.refresh_stats_after_query);
        assert_eq!(config.chat.history_limit, Some(25));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("api:\n  timeout_seconds: 10\n").unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000/api/v1");
        assert_eq!(config.session.backend, SessionBackend::File);
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        let cli = crate::cli::Cli::try_parse_from(["llmq", "logout"]).unwrap();
        let config = Config::load("nonexistent.yaml", &cli).unwrap();
        assert_eq!(config.session.backend, SessionBackend::File);
    }

    #[test]
    fn test_cli_overrides_apply() {
        let cli = crate::cli::Cli::try_parse_from([
            "llmq",
            "--base-url",
            "http://other:9000/api/v1",
            "--session-backend",
            "memory",
            "logout",
        ])
        .unwrap();
        let mut config = Config::default();
        config.apply_cli_overrides(&cli);
        assert_eq!(config.api.base_url, "http://other:9000/api/v1");
        assert_eq!(config.session.backend, SessionBackend::Memory);
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_overrides_fields() {
        std::env::set_var("LLMQ_API_BASE_URL", "http://env-host:8000/api/v1");
        std::env::set_var("LLMQ_API_TIMEOUT_SECONDS", "15");
        std::env::set_var("LLMQ_SESSION_BACKEND", "keyring");
        std::env::set_var("LLMQ_HISTORY_LIMIT", "5");
        std::env::set_var("LLMQ_REFRESH_STATS", "false");

        let mut config = Config::default();
        config.apply_env_vars();

        std::env::remove_var("LLMQ_API_BASE_URL");
        std::env::remove_var("LLMQ_API_TIMEOUT_SECONDS");
        std::env::remove_var("LLMQ_SESSION_BACKEND");
        std::env::remove_var("LLMQ_HISTORY_LIMIT");
        std::env::remove_var("LLMQ_REFRESH_STATS");

        assert_eq!(config.api.base_url, "http://env-host:8000/api/v1");
        assert_eq!(config.api.timeout_seconds, Some(15));
        assert_eq!(config.session.backend, SessionBackend::Keyring);
        assert_eq!(config.chat.history_limit, Some(5));
        assert!(!config.chat.refresh_stats_after_query);
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_ignores_invalid_values() {
        std::env::set_var("LLMQ_API_TIMEOUT_SECONDS", "soon");
        std::env::set_var("LLMQ_SESSION_BACKEND", "redis");

        let mut config = Config::default();
        config.apply_env_vars();

        std::env::remove_var("LLMQ_API_TIMEOUT_SECONDS");
        std::env::remove_var("LLMQ_SESSION_BACKEND");

        assert_eq!(config.api.timeout_seconds, None);
        assert_eq!(config.session.backend, SessionBackend::File);
    }
}
