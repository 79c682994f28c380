//! Error types for llmq
//!
//! This module defines the error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for llmq operations
///
/// User-facing variants (`Validation`, `Auth`, `Query`, `Fetch`) carry the
/// exact text shown to the user. The remaining variants wrap failures of the
/// ambient plumbing: configuration, the session store, and serialization.
#[derive(Error, Debug)]
pub enum LlmqError {
    /// A required field was empty; raised before any network call
    #[error("{0}")]
    Validation(String),

    /// Login or registration rejected, or an authenticated request was refused
    #[error("{0}")]
    Auth(String),

    /// Query submission rejected or failed in transit
    #[error("{0}")]
    Query(String),

    /// Stats or history fetch failed
    #[error("{0}")]
    Fetch(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session persistence errors
    #[error("Session store error: {0}")]
    SessionStore(String),

    /// Operation requires a logged-in session
    #[error("Not logged in. Run `llmq login` or use /login first")]
    NotLoggedIn,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

impl LlmqError {
    /// Whether this error belongs to the user-facing kinds that are
    /// recovered by showing a message.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Auth(_) | Self::Query(_) | Self::Fetch(_)
        )
    }
}

/// Result type alias for llmq plumbing
///
/// Uses `anyhow::Error` so command handlers can attach context freely.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_displays_message_verbatim() {
        let error = LlmqError::Validation("Please fill in all fields".to_string());
        assert_eq!(error.to_string(), "Please fill in all fields");
    }

    #[test]
    fn test_config_error_display() {
        let error = LlmqError::Config("invalid base url".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid base url");
    }

    #[test]
    fn test_session_store_error_display() {
        let error = LlmqError::SessionStore("permission denied".to_string());
        assert_eq!(error.to_string(), "Session store error: permission denied");
    }

    #[test]
    fn test_user_facing_kinds() {
        assert!(LlmqError::Auth("Login failed".into()).is_user_facing());
        assert!(LlmqError::Query("Query failed".into()).is_user_facing());
        assert!(LlmqError::Fetch("Failed to fetch history".into()).is_user_facing());
        assert!(!LlmqError::NotLoggedIn.is_user_facing());
        assert!(!LlmqError::Config("x".into()).is_user_facing());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: LlmqError = io_error.into();
        assert!(matches!(error, LlmqError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: LlmqError = json_error.into();
        assert!(matches!(error, LlmqError::Serialization(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LlmqError>();
    }
}
