//! Backend API abstraction and implementations
//!
//! This module defines the [`QueryApi`] trait covering the five REST
//! endpoints of the LLM query service. Concrete implementations live in
//! submodules:
//!
//! - [`http::HttpQueryApi`] -- reqwest client against a configured base URL.
//! - [`fake::FakeQueryApi`] -- scripted in-process fake for tests.
//!
//! Response bodies from the backend are loose about field names, so the
//! payload types in [`types`] parse them through explicit priority tables
//! instead of ad hoc lookups.
//!
//! # Canonical Import Path
//!
//! ```no_run
//! use llmq::api::QueryApi;
//! ```

use serde::Serialize;
use thiserror::Error;

pub mod fake;
pub mod http;
pub mod types;

pub use types::{DailyLimit, HistoryRecord, QueryReply, Stats, TokenGrant};

/// Errors returned by [`QueryApi`] implementations
///
/// Variants hold owned strings so results can be cloned and scripted by the
/// fake implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced an HTTP response (connect, DNS, TLS, ...)
    #[error("Network error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status
    #[error("Request rejected with status {status}: {}", message.as_deref().unwrap_or("no detail"))]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Message extracted from the `detail` or `message` field, if any
        message: Option<String>,
    },

    /// A 2xx response body could not be interpreted
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Render this error the way the UI shows it.
    ///
    /// Rejections show the server-provided message or `fallback`. Transport
    /// failures are prefixed with `Network error:`. Undecodable bodies are
    /// reported as `fallback` followed by the reason.
    ///
    /// # Examples
    ///
    /// ```
    /// use llmq::api::ApiError;
    ///
    /// let err = ApiError::Rejected { status: 400, message: None };
    /// assert_eq!(err.user_message("Login failed"), "Login failed");
    ///
    /// let err = ApiError::Transport("connection refused".to_string());
    /// assert_eq!(err.user_message("Login failed"), "Network error: connection refused");
    /// ```
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Rejected { message, .. } => message
                .clone()
                .unwrap_or_else(|| fallback.to_string()),
            Self::Transport(reason) => format!("Network error: {}", reason),
            Self::Decode(reason) => format!("{}: {}", fallback, reason),
        }
    }

    /// Whether the server answered at all (as opposed to a transport failure).
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// HTTP status of a rejection, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Body of `POST /auth/register`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/login`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body of `POST /queries/`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QueryRequest {
    pub query: String,
}

/// Client for the LLM query backend
///
/// Authenticated operations take the bearer token explicitly; the client
/// itself holds no session state.
#[async_trait::async_trait]
pub trait QueryApi: Send + Sync {
    /// `POST /auth/register`. The success body is discarded.
    async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError>;

    /// `POST /auth/login`, returning the issued bearer token.
    async fn login(&self, request: &LoginRequest) -> Result<TokenGrant, ApiError>;

    /// `POST /queries/` with a bearer token.
    async fn submit_query(&self, token: &str, query: &str) -> Result<QueryReply, ApiError>;

    /// `GET /queries/stats` with a bearer token.
    async fn fetch_stats(&self, token: &str) -> Result<Stats, ApiError>;

    /// `GET /queries/history` with a bearer token, newest first as the
    /// server orders them.
    async fn fetch_history(
        &self,
        token: &str,
        limit: Option<u32>,
    ) -> Result<Vec<HistoryRecord>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_message() {
        let err = ApiError::Rejected {
            status: 401,
            message: Some("Invalid credentials".to_string()),
        };
        assert_eq!(err.user_message("Login failed"), "Invalid credentials");
    }

    #[test]
    fn test_user_message_decode_includes_fallback() {
        let err = ApiError::Decode("expected JSON".to_string());
        assert_eq!(
            err.user_message("Failed to get response"),
            "Failed to get response: expected JSON"
        );
    }

    #[test]
    fn test_status_only_for_rejections() {
        let rejected = ApiError::Rejected {
            status: 429,
            message: None,
        };
        assert_eq!(rejected.status(), Some(429));
        assert!(rejected.is_rejection());
        assert_eq!(ApiError::Transport("x".into()).status(), None);
    }

    #[test]
    fn test_rejected_display_without_message() {
        let err = ApiError::Rejected {
            status: 500,
            message: None,
        };
        assert_eq!(
            err.to_string(),
            "Request rejected with status 500: no detail"
        );
    }
}
