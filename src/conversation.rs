//! Conversation Controller
//!
//! Owns the transcript, the in-flight query, and the latest usage stats.
//! State changes are synchronous; network calls happen between
//! [`ConversationController::begin_submit`] and
//! [`ConversationController::complete_submit`] so the caller decides how the
//! request is driven.
//!
//! A query moves `Idle -> Submitting -> Idle`. Exactly one query can be in
//! flight; further submissions are dropped until it completes.

use serde::{Deserialize, Serialize};

use crate::api::{ApiError, HistoryRecord, QueryApi, QueryReply, Stats};
use crate::error::LlmqError;
use crate::session::SessionTicket;

/// Author of a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: Option<String>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A submitted query awaiting its response
#[derive(Debug, Clone)]
pub struct PendingQuery {
    text: String,
    ticket: SessionTicket,
}

impl PendingQuery {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn ticket(&self) -> &SessionTicket {
        &self.ticket
    }

    /// Issue the request, giving up if the session ends first.
    ///
    /// Borrows nothing from the controller, so state stays available while
    /// the request is outstanding.
    pub async fn dispatch(&self, api: &dyn QueryApi) -> QueryOutcome {
        tokio::select! {
            biased;
            _ = self.ticket.cancelled() => QueryOutcome::Cancelled,
            result = api.submit_query(self.ticket.token(), &self.text) => match result {
                Ok(reply) => QueryOutcome::Replied(reply),
                Err(e) => QueryOutcome::Failed(e),
            },
        }
    }
}

/// How the request for a [`PendingQuery`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Replied(QueryReply),
    Failed(ApiError),
    /// The session ended before a response arrived
    Cancelled,
}

/// Effect of completing a query on the transcript
#[derive(Debug)]
pub enum Completion {
    /// Assistant reply appended
    Answered,
    /// Error entry appended; the error text belongs in the banner
    Failed(LlmqError),
    /// Response belonged to an ended session and was dropped
    Discarded,
}

/// Owner of the transcript and in-flight query state
#[derive(Debug, Default)]
pub struct ConversationController {
    transcript: Vec<Message>,
    loading: bool,
    stats: Option<Stats>,
}

impl ConversationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }

    /// Start a query
    ///
    /// Appends the user message and marks the controller as loading.
    /// Returns `None` without touching state when `text` is blank, a query
    /// is already in flight, or there is no session.
    pub fn begin_submit(
        &mut self,
        text: &str,
        ticket: Option<SessionTicket>,
    ) -> Option<PendingQuery> {
        if text.trim().is_empty() {
            return None;
        }
        if self.loading {
            tracing::debug!("Dropping submission while a query is in flight");
            return None;
        }
        let ticket = ticket?;

        self.transcript.push(Message::user(text));
        self.loading = true;
        Some(PendingQuery {
            text: text.to_string(),
            ticket,
        })
    }

    /// Finish a query started with [`Self::begin_submit`]
    ///
    /// Loading is released on every path. When `still_current` is false or
    /// the request was cancelled, the transcript is left alone.
    pub fn complete_submit(
        &mut self,
        pending: PendingQuery,
        outcome: QueryOutcome,
        still_current: bool,
    ) -> Completion {
        self.loading = false;

        if !still_current || matches!(outcome, QueryOutcome::Cancelled) {
            tracing::info!("Discarding response for an ended session");
            return Completion::Discarded;
        }

        match outcome {
            QueryOutcome::Replied(reply) => {
                self.transcript.push(Message::assistant(reply.into_content()));
                Completion::Answered
            }
            QueryOutcome::Failed(e) => {
                tracing::warn!(
                    query_chars = pending.text.chars().count(),
                    "Query failed: {}",
                    e
                );
                let entry = if e.is_rejection() {
                    format!("Error: {}", e.user_message("Failed to get response"))
                } else {
                    e.user_message("Failed to get response")
                };
                self.transcript.push(Message::assistant(entry));
                let message = e.user_message("Query failed");
                if e.status() == Some(401) {
                    Completion::Failed(LlmqError::Auth(message))
                } else {
                    Completion::Failed(LlmqError::Query(message))
                }
            }
            QueryOutcome::Cancelled => Completion::Discarded,
        }
    }

    /// Replace the transcript with fetched history
    ///
    /// Each record becomes a user entry followed by an assistant entry, both
    /// carrying the record's timestamp. On failure the transcript is kept.
    ///
    /// # Returns
    ///
    /// Number of records imported
    ///
    /// # Errors
    ///
    /// Returns [`LlmqError::Fetch`] with the banner text
    pub fn apply_history(
        &mut self,
        result: Result<Vec<HistoryRecord>, ApiError>,
    ) -> Result<usize, LlmqError> {
        let records = result.map_err(|e| {
            tracing::warn!("History fetch failed: {}", e);
            match e {
                ApiError::Rejected { status: 401, .. } => {
                    LlmqError::Auth(e.user_message("Failed to fetch history"))
                }
                ApiError::Rejected { .. } => {
                    LlmqError::Fetch("Failed to fetch history".to_string())
                }
                ApiError::Transport(reason) | ApiError::Decode(reason) => {
                    LlmqError::Fetch(format!("Error fetching history: {}", reason))
                }
            }
        })?;

        let count = records.len();
        self.transcript = records
            .into_iter()
            .flat_map(|record| {
                [
                    Message::user(record.query).with_timestamp(record.timestamp.clone()),
                    Message::assistant(record.response).with_timestamp(record.timestamp),
                ]
            })
            .collect();
        tracing::debug!(records = count, "Imported history");
        Ok(count)
    }

    /// Store a stats snapshot; failures are logged and otherwise ignored.
    pub fn apply_stats(&mut self, result: Result<Stats, ApiError>) {
        match result {
            Ok(stats) => self.stats = Some(stats),
            Err(e) => tracing::warn!("Error fetching stats: {}", e),
        }
    }

    /// Empty the transcript. Stats are kept.
    pub fn clear_chat(&mut self) {
        self.transcript.clear();
    }

    /// Drop transcript and stats (used on logout).
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.stats = None;
    }
}
