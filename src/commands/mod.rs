/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `chat`    - Interactive chat session
- `auth`    - Login, registration and logout
- `ask`     - Single query
- `stats`   - Daily usage
- `history` - Previous queries and answers

Every handler builds an [`App`] over the HTTP backend, restores the
persisted session, and drives the app through its operations. The account
commands skip the stats refresh that normally follows a restore.
*/

use std::sync::Arc;

use crate::api::http::HttpQueryApi;
use crate::app::App;
use crate::config::Config;
use crate::error::{LlmqError, Result};
use crate::session::store::build_store;

// Special commands parser for the REPL
pub mod special_commands;

// Terminal output helpers
pub mod render;

/// Build the app for `config` and restore any persisted session
///
/// # Errors
///
/// Returns error if the HTTP client or the session store cannot be created
pub async fn build_app(config: &Config) -> Result<App> {
    let mut app = new_app(config)?;
    if app.restore().await {
        tracing::debug!(username = app.session().username(), "Restored session");
    }
    Ok(app)
}

/// Build the app and restore the persisted session without any request
///
/// Used by the account commands, which replace or drop the session and
/// have no use for its stats.
fn open_app(config: &Config) -> Result<App> {
    let mut app = new_app(config)?;
    app.restore_session();
    Ok(app)
}

fn new_app(config: &Config) -> Result<App> {
    let api = Arc::new(HttpQueryApi::new(&config.api)?);
    let store = build_store(&config.session)?;
    Ok(App::new(api, store, config.chat.clone()))
}

fn require_login(app: &App) -> Result<()> {
    if app.session().is_logged_in() {
        Ok(())
    } else {
        Err(LlmqError::NotLoggedIn.into())
    }
}

fn prompt_password(supplied: Option<String>) -> Result<String> {
    match supplied {
        Some(password) => Ok(password),
        None => Ok(dialoguer::Password::new()
            .with_prompt("Password")
            .interact()?),
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat session handler.
    //!
    //! Runs a readline loop: special commands drive the session, anything
    //! else is submitted as a query once logged in.

    use super::*;
    use crate::commands::render;
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::conversation::QueryOutcome;
    use crate::session::AuthView;
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start the interactive chat session
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use llmq::commands::chat;
    /// use llmq::config::Config;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// chat::run_chat(Config::default()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run_chat(config: Config) -> Result<()> {
        tracing::info!("Starting interactive chat session");

        let mut app = build_app(&config).await?;
        let mut rl = DefaultEditor::new()?;

        render::print_welcome_banner(&app, &config.api.base_url);

        loop {
            let prompt = render::format_prompt(&app);
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(trimmed)?;

                    match parse_special_command(trimmed) {
                        Ok(SpecialCommand::Exit) => break,
                        Ok(SpecialCommand::None) => submit_line(&mut app, trimmed).await,
                        Ok(command) => handle_special(&mut app, &config, command).await?,
                        Err(e) => println!("{}\n", e.to_string().red()),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Error: {:?}", err);
                    break;
                }
            }
        }

        Ok(())
    }

    /// Submit a line as a query and print the new transcript entries
    ///
    /// Ctrl-C while waiting abandons the response; the transcript keeps the
    /// question without an answer.
    async fn submit_line(app: &mut App, text: &str) {
        if !app.session().is_logged_in() {
            println!(
                "{}\n",
                "Not logged in. Use /login or /register first.".yellow()
            );
            return;
        }

        let before = app.transcript().len();
        let Some(pending) = app.begin_submit(text) else {
            return;
        };

        let api = app.api();
        let outcome = tokio::select! {
            outcome = pending.dispatch(api.as_ref()) => outcome,
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Query abandoned".yellow());
                QueryOutcome::Cancelled
            }
        };

        // Errors are already mirrored into the transcript and the banner.
        let _ = app.finish_submit(pending, outcome).await;

        // Skip the echo of the user's own line.
        let new_entries = app.transcript().get(before + 1..).unwrap_or_default();
        render::print_messages(new_entries);
        render::print_banner(app);
        println!();
    }

    async fn handle_special(
        app: &mut App,
        config: &Config,
        command: SpecialCommand,
    ) -> Result<()> {
        match command {
            SpecialCommand::Login => {
                if app.auth_view() != AuthView::Login {
                    app.toggle_view();
                }
                let username: String = dialoguer::Input::new()
                    .with_prompt("Username")
                    .interact_text()?;
                let password = prompt_password(None)?;
                match app.login_with(&username, &password).await {
                    Ok(()) => {
                        println!(
                            "{}\n",
                            format!("Logged in as {}", app.session().username()).green()
                        );
                        if let Some(stats) = app.stats() {
                            println!("{}\n", render::format_stats_line(stats));
                        }
                    }
                    Err(_) => render::print_banner(app),
                }
            }
            SpecialCommand::Register => {
                if app.auth_view() != AuthView::Register {
                    app.toggle_view();
                }
                let username: String = dialoguer::Input::new()
                    .with_prompt("Username")
                    .interact_text()?;
                let email: String = dialoguer::Input::new()
                    .with_prompt("Email")
                    .interact_text()?;
                let password = prompt_password(None)?;
                match app.register_with(&username, &email, &password).await {
                    Ok(()) => println!(
                        "{}\n",
                        "Registration successful. Use /login to sign in.".green()
                    ),
                    Err(_) => render::print_banner(app),
                }
            }
            SpecialCommand::Logout => {
                app.logout();
                println!("{}\n", "Logged out".green());
            }
            SpecialCommand::History(limit) => {
                let limit = limit.or(config.chat.history_limit);
                match app.fetch_history_limited(limit).await {
                    Ok(0) if app.transcript().is_empty() => {
                        println!("{}\n", "No query history found.".yellow());
                    }
                    Ok(_) => {
                        render::print_messages(app.transcript());
                        println!();
                    }
                    Err(LlmqError::NotLoggedIn) => {
                        println!("{}\n", LlmqError::NotLoggedIn.to_string().yellow());
                    }
                    Err(_) => render::print_banner(app),
                }
            }
            SpecialCommand::Stats => {
                if !app.session().is_logged_in() {
                    println!("{}\n", LlmqError::NotLoggedIn.to_string().yellow());
                    return Ok(());
                }
                app.fetch_stats().await;
                match app.stats() {
                    Some(stats) => println!("{}\n", render::format_stats_line(stats)),
                    None => println!("{}\n", "Usage is unavailable right now.".yellow()),
                }
            }
            SpecialCommand::Clear => {
                app.clear_chat();
                println!("{}\n", "Transcript cleared".green());
            }
            SpecialCommand::ShowStatus => {
                render::print_status_display(app, &config.api.base_url);
            }
            SpecialCommand::Help => print_help(),
            SpecialCommand::Exit | SpecialCommand::None => {}
        }
        Ok(())
    }
}

// Account command handlers
pub mod auth {
    //! Login, registration and logout without entering the REPL.

    use super::*;
    use colored::Colorize;

    /// Log in and persist the session
    ///
    /// # Errors
    ///
    /// Returns the validation or server error
    pub async fn login(config: Config, username: String, password: Option<String>) -> Result<()> {
        let mut app = open_app(&config)?;
        let password = prompt_password(password)?;
        app.login_with(&username, &password).await?;
        println!(
            "{}",
            format!("Logged in as {}", app.session().username()).green()
        );
        Ok(())
    }

    /// Create an account; does not log in
    ///
    /// # Errors
    ///
    /// Returns the validation or server error
    pub async fn register(
        config: Config,
        username: String,
        email: String,
        password: Option<String>,
    ) -> Result<()> {
        let mut app = open_app(&config)?;
        let password = prompt_password(password)?;
        app.register_with(&username, &email, &password).await?;
        println!(
            "{}",
            format!("Registered {}. Run `llmq login -u {}` to sign in.", username, username)
                .green()
        );
        Ok(())
    }

    /// Forget the persisted session
    ///
    /// # Errors
    ///
    /// Returns error if the session store cannot be opened
    pub async fn logout(config: Config) -> Result<()> {
        let mut app = open_app(&config)?;
        let was_logged_in = app.session().is_logged_in();
        app.logout();
        if was_logged_in {
            println!("{}", "Logged out".green());
        } else {
            println!("{}", "No active session".yellow());
        }
        Ok(())
    }
}

// One-shot query handler
pub mod ask {
    //! Submit a single query and print the answer.

    use super::*;

    /// Submit `query` with the persisted session and print the reply
    ///
    /// # Errors
    ///
    /// Returns [`LlmqError::NotLoggedIn`] without a session, or the query
    /// failure message
    pub async fn run_ask(config: Config, query: String) -> Result<()> {
        let mut app = build_app(&config).await?;
        require_login(&app)?;

        if query.trim().is_empty() {
            return Err(LlmqError::Validation("Query must not be empty".to_string()).into());
        }

        app.submit_query(&query).await?;
        if let Some(reply) = app.transcript().last() {
            println!("{}", reply.content);
        }
        Ok(())
    }
}

// Usage stats handler
pub mod stats {
    //! Display today's usage.

    use super::*;
    use crate::commands::render;

    /// Fetch and print usage stats
    ///
    /// # Errors
    ///
    /// Returns error without a session or if the stats cannot be fetched
    pub async fn show_stats(config: Config, json: bool) -> Result<()> {
        let mut app = build_app(&config).await?;
        require_login(&app)?;

        // restore() already fetched once; without a result the backend failed.
        let Some(stats) = app.stats() else {
            return Err(LlmqError::Fetch("Failed to fetch stats".to_string()).into());
        };

        if json {
            println!("{}", serde_json::to_string_pretty(stats)?);
        } else {
            println!("\nUsage for {}:\n", app.session().username());
            render::stats_table(stats).printstd();
            println!();
        }
        Ok(())
    }
}

// History handler
pub mod history {
    //! Display previous queries and answers.

    use super::*;
    use crate::commands::render;
    use colored::Colorize;

    /// Fetch and print query history
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `limit` - Record limit; falls back to `chat.history_limit`
    /// * `json` - Print the transcript entries as JSON
    ///
    /// # Errors
    ///
    /// Returns error without a session or if history cannot be fetched
    pub async fn show_history(config: Config, limit: Option<u32>, json: bool) -> Result<()> {
        let mut app = build_app(&config).await?;
        require_login(&app)?;

        let limit = limit.or(config.chat.history_limit);
        let count = app.fetch_history_limited(limit).await?;

        if json {
            println!("{}", serde_json::to_string_pretty(app.transcript())?);
            return Ok(());
        }

        if count == 0 {
            println!("{}", "No query history found.".yellow());
            return Ok(());
        }

        println!("\nQuery history ({} records):", count);
        render::history_table(app.transcript()).printstd();
        println!();
        Ok(())
    }
}
