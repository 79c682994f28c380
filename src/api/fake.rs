//! In-process fake backend for unit and integration tests
//!
//! [`FakeQueryApi`] implements [`QueryApi`] from scripted responses and
//! records every call it receives, so tests can assert both on resulting
//! state and on which requests were (or were not) issued.
//!
//! Each endpoint has a FIFO script. When a script is empty the endpoint falls
//! back to a benign default (successful register, token `fake-token`, reply
//! `ok`, zeroed stats, empty history).
//!
//! # Example
//!
//! ```
//! use llmq::api::fake::{FakeCall, FakeQueryApi};
//! use llmq::api::{QueryApi, QueryReply};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let api = FakeQueryApi::new();
//! api.push_query(Ok(QueryReply::Response("hi".to_string())));
//!
//! let reply = api.submit_query("t1", "hello").await.unwrap();
//! assert_eq!(reply.into_content(), "hi");
//! assert_eq!(
//!     api.calls(),
//!     vec![FakeCall::SubmitQuery { token: "t1".to_string(), query: "hello".to_string() }]
//! );
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::api::{
    ApiError, DailyLimit, HistoryRecord, LoginRequest, QueryApi, QueryReply, RegisterRequest,
    Stats, TokenGrant,
};

/// A request observed by [`FakeQueryApi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    Register { username: String, email: String },
    Login { username: String },
    SubmitQuery { token: String, query: String },
    FetchStats { token: String },
    FetchHistory { token: String, limit: Option<u32> },
}

type Script<T> = Mutex<VecDeque<Result<T, ApiError>>>;

/// Scripted [`QueryApi`] implementation
#[derive(Debug, Default)]
pub struct FakeQueryApi {
    calls: Mutex<Vec<FakeCall>>,
    register: Script<()>,
    login: Script<TokenGrant>,
    query: Script<QueryReply>,
    stats: Script<Stats>,
    history: Script<Vec<HistoryRecord>>,
    hold_queries: AtomicBool,
}

fn next<T>(
    script: &Script<T>,
    default: impl FnOnce() -> Result<T, ApiError>,
) -> Result<T, ApiError> {
    script
        .lock()
        .ok()
        .and_then(|mut queue| queue.pop_front())
        .unwrap_or_else(default)
}

fn push<T>(script: &Script<T>, result: Result<T, ApiError>) {
    if let Ok(mut queue) = script.lock() {
        queue.push_back(result);
    }
}

impl FakeQueryApi {
    /// Create a fake with empty scripts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next `register` call.
    pub fn push_register(&self, result: Result<(), ApiError>) {
        push(&self.register, result);
    }

    /// Queue the result of the next `login` call.
    pub fn push_login(&self, result: Result<TokenGrant, ApiError>) {
        push(&self.login, result);
    }

    /// Queue the result of the next `submit_query` call.
    pub fn push_query(&self, result: Result<QueryReply, ApiError>) {
        push(&self.query, result);
    }

    /// Queue the result of the next `fetch_stats` call.
    pub fn push_stats(&self, result: Result<Stats, ApiError>) {
        push(&self.stats, result);
    }

    /// Queue the result of the next `fetch_history` call.
    pub fn push_history(&self, result: Result<Vec<HistoryRecord>, ApiError>) {
        push(&self.history, result);
    }

    /// Make `submit_query` never complete, simulating a request that is
    /// still in flight.
    pub fn hold_queries(&self, hold: bool) {
        self.hold_queries.store(hold, Ordering::SeqCst);
    }

    /// All calls received so far, in order.
    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    fn record(&self, call: FakeCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait::async_trait]
impl QueryApi for FakeQueryApi {
    async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        self.record(FakeCall::Register {
            username: request.username.clone(),
            email: request.email.clone(),
        });
        next(&self.register, || Ok(()))
    }

    async fn login(&self, request: &LoginRequest) -> Result<TokenGrant, ApiError> {
        self.record(FakeCall::Login {
            username: request.username.clone(),
        });
        next(&self.login, || {
            Ok(TokenGrant::AccessToken("fake-token".to_string()))
        })
    }

    async fn submit_query(&self, token: &str, query: &str) -> Result<QueryReply, ApiError> {
        self.record(FakeCall::SubmitQuery {
            token: token.to_string(),
            query: query.to_string(),
        });
        if self.hold_queries.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        next(&self.query, || Ok(QueryReply::Response("ok".to_string())))
    }

    async fn fetch_stats(&self, token: &str) -> Result<Stats, ApiError> {
        self.record(FakeCall::FetchStats {
            token: token.to_string(),
        });
        next(&self.stats, || {
            Ok(Stats {
                daily_queries: 0,
                daily_limit: DailyLimit::Unlimited,
                reset_at: None,
            })
        })
    }

    async fn fetch_history(
        &self,
        token: &str,
        limit: Option<u32>,
    ) -> Result<Vec<HistoryRecord>, ApiError> {
        self.record(FakeCall::FetchHistory {
            token: token.to_string(),
            limit,
        });
        next(&self.history, || Ok(Vec::new()))
    }
}
