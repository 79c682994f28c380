//! HTTP implementation of [`QueryApi`]
//!
//! [`HttpQueryApi`] issues JSON requests against a single configured base
//! URL (for example `http://localhost:8000/api/v1`). Authenticated requests
//! carry `Authorization: Bearer <token>`.
//!
//! Non-2xx responses are turned into [`ApiError::Rejected`] with the message
//! taken from the body's `detail` or `message` field. Tokens never appear in
//! log output.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

use crate::api::types::error_message;
use crate::api::{
    ApiError, HistoryRecord, LoginRequest, QueryApi, QueryReply, QueryRequest, RegisterRequest,
    Stats, TokenGrant,
};
use crate::config::ApiConfig;
use crate::error::LlmqError;

/// Appended to the reason of a refused authenticated request.
const LOG_IN_AGAIN: &str = "Please log in again";

/// Reason used when the refusal carries no explanation.
const UNAUTHORIZED_REASON: &str = "Session expired or invalid";

/// reqwest-backed client for the LLM query backend
///
/// # Examples
///
/// ```
/// use llmq::api::http::HttpQueryApi;
/// use llmq::config::ApiConfig;
///
/// let api = HttpQueryApi::new(&ApiConfig::default()).unwrap();
/// assert_eq!(api.base_url(), "http://localhost:8000/api/v1");
/// ```
#[derive(Debug, Clone)]
pub struct HttpQueryApi {
    client: Client,
    base_url: String,
}

impl HttpQueryApi {
    /// Create a client from the API configuration
    ///
    /// No timeout is applied unless `timeout_seconds` is configured.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &ApiConfig) -> crate::error::Result<Self> {
        let mut builder = Client::builder().user_agent(concat!("llmq/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(LlmqError::Http)?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        tracing::debug!(base_url = %base_url, "Initialized HTTP API client");

        Ok(Self { client, base_url })
    }

    /// The normalized base URL (no trailing slash)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the decoded JSON body of a 2xx response.
    async fn execute(
        &self,
        request: RequestBuilder,
        authenticated: bool,
    ) -> Result<Value, ApiError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("Request failed before a response arrived: {}", e);
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            let mut message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|body| error_message(&body));
            if authenticated && status == StatusCode::UNAUTHORIZED {
                let reason = message.as_deref().unwrap_or(UNAUTHORIZED_REASON);
                message = Some(format!("{}. {}", reason.trim_end_matches('.'), LOG_IN_AGAIN));
            }
            tracing::debug!(status = status.as_u16(), message = ?message, "Request rejected");
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::warn!("Failed to decode response body: {}", e);
            ApiError::Decode(e.to_string())
        })
    }
}

#[async_trait::async_trait]
impl QueryApi for HttpQueryApi {
    async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        tracing::debug!(username = %request.username, "POST /auth/register");
        let builder = self.client.post(self.url("/auth/register")).json(request);
        match self.execute(builder, false).await {
            // The success body is discarded, so an undecodable one is still a success.
            Ok(_) | Err(ApiError::Decode(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn login(&self, request: &LoginRequest) -> Result<TokenGrant, ApiError> {
        tracing::debug!(username = %request.username, "POST /auth/login");
        let builder = self.client.post(self.url("/auth/login")).json(request);
        let body = self.execute(builder, false).await?;
        TokenGrant::parse(&body)
            .ok_or_else(|| ApiError::Decode("response did not include an access token".to_string()))
    }

    async fn submit_query(&self, token: &str, query: &str) -> Result<QueryReply, ApiError> {
        tracing::debug!(chars = query.chars().count(), "POST /queries/");
        let builder = self
            .client
            .post(self.url("/queries/"))
            .bearer_auth(token)
            .json(&QueryRequest {
                query: query.to_string(),
            });
        let body = self.execute(builder, true).await?;
        Ok(QueryReply::parse(&body))
    }

    async fn fetch_stats(&self, token: &str) -> Result<Stats, ApiError> {
        tracing::debug!("GET /queries/stats");
        let builder = self.client.get(self.url("/queries/stats")).bearer_auth(token);
        let body = self.execute(builder, true).await?;
        Ok(Stats::parse(&body))
    }

    async fn fetch_history(
        &self,
        token: &str,
        limit: Option<u32>,
    ) -> Result<Vec<HistoryRecord>, ApiError> {
        tracing::debug!(limit = ?limit, "GET /queries/history");
        let mut builder = self.client.get(self.url("/queries/history")).bearer_auth(token);
        if let Some(limit) = limit {
            builder = builder.query(&[("limit", limit)]);
        }
        let body = self.execute(builder, true).await?;
        HistoryRecord::parse_list(&body)
            .ok_or_else(|| ApiError::Decode("history response was not a list".to_string()))
    }
}
