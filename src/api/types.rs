//! Response payloads of the LLM query backend
//!
//! The backend has shipped several spellings of the same fields over time
//! (`access_token` vs `token`, `response` vs `answer`, ...). Every payload
//! here is parsed from a [`serde_json::Value`] through a priority table: the
//! first listed field holding a usable value wins.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Token fields of the login response, in priority order.
pub const TOKEN_FIELDS: &[&str] = &["access_token", "token"];

/// Reply fields of the query response, in priority order.
pub const REPLY_FIELDS: &[&str] = &["response", "answer"];

/// Usage counter fields of the stats response, in priority order.
pub const QUERY_COUNT_FIELDS: &[&str] = &["daily_queries", "queries_today", "queries_used_today"];

/// Limit fields of the stats response, in priority order.
pub const LIMIT_FIELDS: &[&str] = &["daily_limit", "limit"];

/// Error message fields of a non-2xx response, in priority order.
pub const ERROR_FIELDS: &[&str] = &["detail", "message"];

/// Timestamp fields of a history record, in priority order.
pub const TIMESTAMP_FIELDS: &[&str] = &["timestamp", "created_at"];

/// Transcript content used when a successful query response has no reply field.
pub const NO_RESPONSE: &str = "No response received";

/// Returns the first field in `fields` holding a non-empty string.
fn first_string<'a>(body: &'a Value, fields: &[&'static str]) -> Option<(&'static str, &'a str)> {
    fields.iter().find_map(|field| {
        body.get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(|s| (*field, s))
    })
}

/// Returns the first field in `fields` holding a non-negative integer.
fn first_count(body: &Value, fields: &[&'static str]) -> Option<u64> {
    fields
        .iter()
        .find_map(|field| body.get(field).and_then(Value::as_u64))
}

/// Bearer token issued by `POST /auth/login`, tagged by the field it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenGrant {
    /// `access_token` (current backend)
    AccessToken(String),
    /// `token` (legacy backend)
    Token(String),
}

impl TokenGrant {
    /// Parse a login response body.
    ///
    /// Returns `None` when neither token field carries a non-empty string.
    ///
    /// # Examples
    ///
    /// ```
    /// use llmq::api::TokenGrant;
    ///
    /// let body = serde_json::json!({"access_token": "t1", "token_type": "bearer"});
    /// let grant = TokenGrant::parse(&body).unwrap();
    /// assert_eq!(grant.into_token(), "t1");
    /// ```
    pub fn parse(body: &Value) -> Option<Self> {
        let (field, token) = first_string(body, TOKEN_FIELDS)?;
        Some(match field {
            "access_token" => Self::AccessToken(token.to_string()),
            _ => Self::Token(token.to_string()),
        })
    }

    /// The token string regardless of which field supplied it.
    pub fn as_str(&self) -> &str {
        match self {
            Self::AccessToken(t) | Self::Token(t) => t,
        }
    }

    /// Consume the grant, returning the token string.
    pub fn into_token(self) -> String {
        match self {
            Self::AccessToken(t) | Self::Token(t) => t,
        }
    }
}

/// Reply to `POST /queries/`, tagged by the field it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryReply {
    /// `response` (current backend)
    Response(String),
    /// `answer` (legacy backend)
    Answer(String),
    /// Neither field present
    Missing,
}

impl QueryReply {
    /// Parse a query response body.
    pub fn parse(body: &Value) -> Self {
        match first_string(body, REPLY_FIELDS) {
            Some(("response", text)) => Self::Response(text.to_string()),
            Some((_, text)) => Self::Answer(text.to_string()),
            None => Self::Missing,
        }
    }

    /// Transcript content for this reply, using [`NO_RESPONSE`] when missing.
    ///
    /// # Examples
    ///
    /// ```
    /// use llmq::api::QueryReply;
    ///
    /// let reply = QueryReply::parse(&serde_json::json!({"answer": "42"}));
    /// assert_eq!(reply.into_content(), "42");
    ///
    /// let reply = QueryReply::parse(&serde_json::json!({}));
    /// assert_eq!(reply.into_content(), "No response received");
    /// ```
    pub fn into_content(self) -> String {
        match self {
            Self::Response(text) | Self::Answer(text) => text,
            Self::Missing => NO_RESPONSE.to_string(),
        }
    }
}

/// Daily query allowance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyLimit {
    Limited(u64),
    Unlimited,
}

impl fmt::Display for DailyLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(n) => write!(f, "{}", n),
            Self::Unlimited => write!(f, "unlimited"),
        }
    }
}

/// Usage counters from `GET /queries/stats`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Queries issued today
    pub daily_queries: u64,
    /// Allowance for today
    pub daily_limit: DailyLimit,
    /// When the counter resets, as reported by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<String>,
}

impl Stats {
    /// Parse a stats response body.
    ///
    /// The limit comes from `daily_limit` or `limit`. When neither is present
    /// but the server reports `queries_remaining`, the limit is derived as
    /// `queries_used_today + queries_remaining`. Otherwise it is unlimited.
    ///
    /// # Examples
    ///
    /// ```
    /// use llmq::api::{DailyLimit, Stats};
    ///
    /// let body = serde_json::json!({"queries_used_today": 3, "queries_remaining": 7});
    /// let stats = Stats::parse(&body);
    /// assert_eq!(stats.daily_queries, 3);
    /// assert_eq!(stats.daily_limit, DailyLimit::Limited(10));
    /// ```
    pub fn parse(body: &Value) -> Self {
        let daily_queries = first_count(body, QUERY_COUNT_FIELDS).unwrap_or(0);

        let daily_limit = match first_count(body, LIMIT_FIELDS) {
            Some(limit) => DailyLimit::Limited(limit),
            None => match (
                body.get("queries_used_today").and_then(Value::as_u64),
                body.get("queries_remaining").and_then(Value::as_u64),
            ) {
                (Some(used), Some(remaining)) => {
                    DailyLimit::Limited(used.saturating_add(remaining))
                }
                _ => DailyLimit::Unlimited,
            },
        };

        let reset_at = first_string(body, &["reset_at"]).map(|(_, s)| s.to_string());

        Self {
            daily_queries,
            daily_limit,
            reset_at,
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Queries: {} / {}", self.daily_queries, self.daily_limit)
    }
}

/// One past turn from `GET /queries/history`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub query: String,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl HistoryRecord {
    /// Parse a single history record. Returns `None` if `query` is missing.
    pub fn parse(record: &Value) -> Option<Self> {
        let query = record.get("query").and_then(Value::as_str)?.to_string();
        // The backend stores a null response for failed queries.
        let response = record
            .get("response")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let timestamp = first_string(record, TIMESTAMP_FIELDS).map(|(_, s)| s.to_string());
        Some(Self {
            query,
            response,
            timestamp,
        })
    }

    /// Parse a history response body.
    ///
    /// Accepts either a bare array of records or the `{"queries": [...]}`
    /// envelope. Records without a `query` field are skipped.
    pub fn parse_list(body: &Value) -> Option<Vec<Self>> {
        let records = match body {
            Value::Array(items) => items,
            Value::Object(map) => map.get("queries")?.as_array()?,
            _ => return None,
        };

        Some(
            records
                .iter()
                .filter_map(|record| {
                    let parsed = Self::parse(record);
                    if parsed.is_none() {
                        tracing::debug!("Skipping history record without query field");
                    }
                    parsed
                })
                .collect(),
        )
    }
}

/// Extract the user-facing message from a non-2xx response body.
///
/// `detail` may be a string or, for FastAPI validation failures, a list of
/// objects whose `msg` entries are joined with `; `.
pub fn error_message(body: &Value) -> Option<String> {
    ERROR_FIELDS.iter().find_map(|field| match body.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if msgs.is_empty() {
                None
            } else {
                Some(msgs.join("; "))
            }
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_grant_prefers_access_token() {
        let grant = TokenGrant::parse(&json!({"access_token": "a", "token": "b"})).unwrap();
        assert_eq!(grant, TokenGrant::AccessToken("a".to_string()));
    }

    #[test]
    fn test_token_grant_falls_back_to_token() {
        let grant = TokenGrant::parse(&json!({"token": "b"})).unwrap();
        assert_eq!(grant, TokenGrant::Token("b".to_string()));
        assert_eq!(grant.as_str(), "b");
    }

    #[test]
    fn test_token_grant_skips_empty_strings() {
        let grant = TokenGrant::parse(&json!({"access_token": "", "token": "b"})).unwrap();
        assert_eq!(grant.into_token(), "b");
        assert!(TokenGrant::parse(&json!({"access_token": null})).is_none());
    }

    #[test]
    fn test_query_reply_priority() {
        assert_eq!(
            QueryReply::parse(&json!({"response": "hi", "answer": "no"})),
            QueryReply::Response("hi".to_string())
        );
        assert_eq!(
            QueryReply::parse(&json!({"answer": "yes"})),
            QueryReply::Answer("yes".to_string())
        );
        assert_eq!(QueryReply::parse(&json!({"other": 1})), QueryReply::Missing);
    }

    #[test]
    fn test_stats_parse_primary_fields() {
        let stats = Stats::parse(&json!({"daily_queries": 4, "daily_limit": 10}));
        assert_eq!(stats.daily_queries, 4);
        assert_eq!(stats.daily_limit, DailyLimit::Limited(10));
        assert_eq!(stats.to_string(), "Queries: 4 / 10");
    }

    #[test]
    fn test_stats_parse_legacy_fields() {
        let stats = Stats::parse(&json!({"queries_today": 2, "limit": 5}));
        assert_eq!(stats.daily_queries, 2);
        assert_eq!(stats.daily_limit, DailyLimit::Limited(5));
    }

    #[test]
    fn test_stats_parse_unlimited_when_no_limit() {
        let stats = Stats::parse(&json!({"daily_queries": 9}));
        assert_eq!(stats.daily_limit, DailyLimit::Unlimited);
        assert_eq!(stats.to_string(), "Queries: 9 / unlimited");
    }

    #[test]
    fn test_stats_parse_backend_shape_derives_limit() {
        let stats = Stats::parse(&json!({
            "queries_used_today": 3,
            "queries_remaining": 7,
            "reset_at": "2024-05-02T00:00:00"
        }));
        assert_eq!(stats.daily_queries, 3);
        assert_eq!(stats.daily_limit, DailyLimit::Limited(10));
        assert_eq!(stats.reset_at.as_deref(), Some("2024-05-02T00:00:00"));
    }

    #[test]
    fn test_stats_parse_derived_limit_saturates() {
        let stats = Stats::parse(&json!({
            "queries_used_today": u64::MAX,
            "queries_remaining": 1
        }));
        assert_eq!(stats.daily_limit, DailyLimit::Limited(u64::MAX));
    }

    #[test]
    fn test_stats_parse_empty_body_defaults() {
        let stats = Stats::parse(&json!({}));
        assert_eq!(stats.daily_queries, 0);
        assert_eq!(stats.daily_limit, DailyLimit::Unlimited);
        assert!(stats.reset_at.is_none());
    }

    #[test]
    fn test_history_parse_bare_array() {
        let body = json!([
            {"query": "q1", "response": "r1", "timestamp": "t1"},
            {"query": "q2", "response": null, "created_at": "t2"}
        ]);
        let records = HistoryRecord::parse_list(&body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].timestamp.as_deref(), Some("t1"));
        assert_eq!(records[1].response, "");
        assert_eq!(records[1].timestamp.as_deref(), Some("t2"));
    }

    #[test]
    fn test_history_parse_envelope() {
        let body = json!({"queries": [{"query": "q", "response": "r"}], "count": 1});
        let records = HistoryRecord::parse_list(&body).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].timestamp.is_none());
    }

    #[test]
    fn test_history_parse_skips_records_without_query() {
        let body = json!([{"response": "orphan"}, {"query": "q", "response": "r"}]);
        let records = HistoryRecord::parse_list(&body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].query, "q");
    }

    #[test]
    fn test_history_parse_rejects_scalars() {
        assert!(HistoryRecord::parse_list(&json!("nope")).is_none());
        assert!(HistoryRecord::parse_list(&json!({"count": 0})).is_none());
    }

    #[test]
    fn test_error_message_detail_then_message() {
        assert_eq!(
            error_message(&json!({"detail": "Invalid credentials", "message": "x"})),
            Some("Invalid credentials".to_string())
        );
        assert_eq!(
            error_message(&json!({"message": "Username taken"})),
            Some("Username taken".to_string())
        );
        assert_eq!(error_message(&json!({"error": "x"})), None);
    }

    #[test]
    fn test_error_message_joins_validation_list() {
        let body = json!({"detail": [
            {"loc": ["body", "password"], "msg": "ensure this value has at least 8 characters"},
            {"loc": ["body", "email"], "msg": "value is not a valid email address"}
        ]});
        assert_eq!(
            error_message(&body).unwrap(),
            "ensure this value has at least 8 characters; value is not a valid email address"
        );
    }
}
