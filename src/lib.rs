//! llmq - terminal client library for the LLM query service
//!
//! This library provides the client state and backend plumbing used by the
//! `llmq` binary: authentication and session persistence, query submission,
//! usage stats and history retrieval.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `api`: Backend client trait, HTTP implementation and payload parsing
//! - `session`: Session state, auth form and session persistence
//! - `conversation`: Transcript, loading flag and usage stats
//! - `app`: State container composing session, conversation and banner
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: REPL and one-shot command handlers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use llmq::api::http::HttpQueryApi;
//! use llmq::session::store::build_store;
//! use llmq::{App, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let api = Arc::new(HttpQueryApi::new(&config.api)?);
//!     let mut app = App::new(api, build_store(&config.session)?, config.chat.clone());
//!     app.restore().await;
//!     app.submit_query("What is ownership in Rust?").await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod error;
pub mod session;

// Re-export commonly used types
pub use api::{ApiError, QueryApi};
pub use app::App;
pub use config::Config;
pub use conversation::{Message, Role};
pub use error::{LlmqError, Result};
pub use session::{Session, SessionManager};
