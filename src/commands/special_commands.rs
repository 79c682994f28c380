//! Special commands parser for the interactive chat session
//!
//! Input starting with `/` is treated as a command rather than a query.
//! Special commands allow users to:
//! - Log in, register and log out without leaving the session
//! - Load history and usage stats from the server
//! - Clear the local transcript
//! - Display status and help information
//! - Exit the session
//!
//! Commands are case-insensitive.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },
}

/// Special commands that can be executed during interactive chat
///
/// These commands drive the session or show information instead of being
/// sent to the backend as a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Prompt for credentials and log in
    Login,

    /// Prompt for account details and register
    Register,

    /// End the session and forget the persisted token
    Logout,

    /// Replace the transcript with the server-side history
    ///
    /// Carries an optional record limit overriding the configured one.
    History(Option<u32>),

    /// Show today's usage
    Stats,

    /// Empty the local transcript
    Clear,

    /// Show login state, backend and usage
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input should be submitted as a query.
    None,
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns CommandError::UnknownCommand if input starts with "/" but is not a valid command.
/// Returns CommandError::UnsupportedArgument if a command receives an invalid argument.
///
/// # Examples
///
/// ```
/// use llmq::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/history 5").unwrap(), SpecialCommand::History(Some(5)));
/// assert_eq!(parse_special_command("quit").unwrap(), SpecialCommand::Exit);
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let mut parts = lower.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let arg = parts.collect::<Vec<_>>().join(" ");

    let no_arg = |cmd: SpecialCommand| {
        if arg.is_empty() {
            Ok(cmd)
        } else {
            Err(CommandError::UnsupportedArgument {
                command: command.to_string(),
                arg: arg.clone(),
            })
        }
    };

    match command {
        "/login" => no_arg(SpecialCommand::Login),
        "/register" | "/signup" => no_arg(SpecialCommand::Register),
        "/logout" => no_arg(SpecialCommand::Logout),
        "/history" => {
            if arg.is_empty() {
                return Ok(SpecialCommand::History(None));
            }
            match arg.parse::<u32>() {
                Ok(limit) if limit > 0 => Ok(SpecialCommand::History(Some(limit))),
                _ => Err(CommandError::UnsupportedArgument {
                    command: "/history".to_string(),
                    arg: arg.clone(),
                }),
            }
        }
        "/stats" => no_arg(SpecialCommand::Stats),
        "/clear" => no_arg(SpecialCommand::Clear),
        "/status" => no_arg(SpecialCommand::ShowStatus),
        "/help" | "/?" => no_arg(SpecialCommand::Help),
        "/exit" | "/quit" | "exit" | "quit" => no_arg(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Display help for the interactive session
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

ACCOUNT:
  /login          - Log in (prompts for username and password)
  /register       - Create an account (prompts for username, email, password)
  /signup         - Same as /register
  /logout         - Log out and forget the saved session

CONVERSATION:
  /history        - Replace the transcript with your query history
  /history <N>    - Same, requesting at most N records
  /clear          - Clear the local transcript
  /stats          - Show today's query usage

SESSION INFORMATION:
  /status         - Show login state, backend and usage
  /help           - Show this help message
  /?              - Same as /help

SESSION CONTROL:
  exit            - Exit interactive mode
  quit            - Same as exit

NOTES:
  - Commands are case-insensitive
  - Regular text (not starting with /) is sent as a query once logged in
  - Only one query is in flight at a time
"#
    );
}
