//! Command-line interface definition for llmq
//!
//! This module defines the CLI structure using clap's derive API,
//! providing the interactive chat REPL plus one-shot account and query
//! commands.

use clap::{Parser, Subcommand};

use crate::config::SessionBackend;

/// llmq - terminal client for the LLM query service
///
/// Log in, ask questions, and review your query history and daily usage
/// from the terminal.
#[derive(Parser, Debug, Clone)]
#[command(name = "llmq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    pub json_logs: bool,

    /// Override the backend base URL (e.g. http://localhost:8000/api/v1)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Override where the session is persisted (file, keyring, memory)
    #[arg(long, global = true, value_parser = SessionBackend::parse_str)]
    pub session_backend: Option<SessionBackend>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for llmq
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the interactive chat session
    Chat,

    /// Log in and persist the session
    Login {
        /// Account username
        #[arg(short, long)]
        username: String,

        /// Account password (prompted for when omitted)
        #[arg(short, long, env = "LLMQ_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create a new account
    Register {
        /// Account username
        #[arg(short, long)]
        username: String,

        /// Contact email address
        #[arg(short, long)]
        email: String,

        /// Account password (prompted for when omitted)
        #[arg(short, long, env = "LLMQ_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the persisted session
    Logout,

    /// Send a single query and print the answer
    Ask {
        /// Query text
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Show today's query usage
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show previous queries and answers
    History {
        /// Maximum number of records to request
        #[arg(short = 'n', long)]
        limit: Option<u32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_chat_command() {
        let cli = Cli::try_parse_from(["llmq", "chat"]).unwrap();
        assert!(matches!(cli.command, Commands::Chat));
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(!cli.json_logs);
    }

    #[test]
    fn test_cli_parse_login() {
        let cli = Cli::try_parse_from(["llmq", "login", "-u", "alice", "-p", "secret"]).unwrap();
        match cli.command {
            Commands::Login { username, password } => {
                assert_eq!(username, "alice");
                assert_eq!(password, Some("secret".to_string()));
            }
            other => panic!("Expected Login, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_register_requires_email() {
        assert!(Cli::try_parse_from(["llmq", "register", "-u", "alice"]).is_err());
        let cli =
            Cli::try_parse_from(["llmq", "register", "-u", "alice", "-e", "a@x.io"]).unwrap();
        assert!(matches!(cli.command, Commands::Register { .. }));
    }

    #[test]
    fn test_cli_parse_ask_joins_words() {
        let cli = Cli::try_parse_from(["llmq", "ask", "what", "is", "rust"]).unwrap();
        match cli.command {
            Commands::Ask { query } => assert_eq!(query.join(" "), "what is rust"),
            other => panic!("Expected Ask, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_ask_requires_text() {
        assert!(Cli::try_parse_from(["llmq", "ask"]).is_err());
    }

    #[test]
    fn test_cli_parse_history_with_limit_and_json() {
        let cli = Cli::try_parse_from(["llmq", "history", "-n", "5", "--json"]).unwrap();
        match cli.command {
            Commands::History { limit, json } => {
                assert_eq!(limit, Some(5));
                assert!(json);
            }
            other => panic!("Expected History, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_global_overrides_after_subcommand() {
        let cli = Cli::try_parse_from([
            "llmq",
            "stats",
            "--base-url",
            "http://api.test/api/v1",
            "--session-backend",
            "keyring",
        ])
        .unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://api.test/api/v1"));
        assert_eq!(cli.session_backend, Some(SessionBackend::Keyring));
    }

    #[test]
    fn test_cli_rejects_unknown_session_backend() {
        assert!(Cli::try_parse_from(["llmq", "--session-backend", "cloud", "logout"]).is_err());
    }
}
