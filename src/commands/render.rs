//! Terminal rendering for the chat session and one-shot commands
//!
//! Formatting lives here as pure functions returning strings or tables so
//! the command handlers stay small and the output can be tested.

use chrono::{DateTime, NaiveDateTime};
use colored::Colorize;
use prettytable::{format, row, Table};

use crate::api::{DailyLimit, Stats};
use crate::app::App;
use crate::conversation::{Message, Role};
use crate::session::AuthView;

/// Readline prompt reflecting the login state
pub fn format_prompt(app: &App) -> String {
    let session = app.session();
    if session.is_logged_in() {
        format!("{} > ", session.username().green().bold())
    } else {
        let view = match app.auth_view() {
            AuthView::Login => "login",
            AuthView::Register => "register",
        };
        format!("{} > ", format!("[logged out: {}]", view).yellow())
    }
}

/// Shorten a backend timestamp to `YYYY-MM-DD HH:MM`
///
/// Accepts RFC 3339 and naive ISO 8601 (with or without fractional
/// seconds); anything else is returned unchanged.
pub fn format_timestamp(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// One transcript entry, prefixed by speaker and optional timestamp.
pub fn format_message(message: &Message) -> String {
    let speaker = match message.role {
        Role::User => "you".cyan().bold(),
        Role::Assistant => "llm".magenta().bold(),
    };
    match &message.timestamp {
        Some(ts) => format!(
            "{} {} {}",
            format_timestamp(ts).dimmed(),
            speaker,
            message.content
        ),
        None => format!("{} {}", speaker, message.content),
    }
}

pub fn print_messages(messages: &[Message]) {
    for message in messages {
        println!("{}", format_message(message));
    }
}

/// Print the banner error, if set.
pub fn print_banner(app: &App) {
    if let Some(banner) = app.banner() {
        println!("{} {}", "error:".red().bold(), banner.red());
    }
}

/// Short usage line such as `Queries: 3 / 10`, coloured by headroom.
pub fn format_stats_line(stats: &Stats) -> String {
    let line = stats.to_string();
    match stats.daily_limit {
        DailyLimit::Limited(limit) if stats.daily_queries >= limit => line.red().to_string(),
        DailyLimit::Limited(limit)
            if u128::from(stats.daily_queries) * 5 >= u128::from(limit) * 4 =>
        {
            line.yellow().to_string()
        }
        _ => line.green().to_string(),
    }
}

/// Usage table for the `stats` command
pub fn stats_table(stats: &Stats) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row!["Queries today", stats.daily_queries]);
    table.add_row(row!["Daily limit", stats.daily_limit]);
    if let DailyLimit::Limited(limit) = stats.daily_limit {
        table.add_row(row!["Remaining", limit.saturating_sub(stats.daily_queries)]);
    }
    if let Some(reset_at) = &stats.reset_at {
        table.add_row(row!["Resets at", reset_at]);
    }
    table
}

/// History table pairing each query with its answer
pub fn history_table(messages: &[Message]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row!["When".bold(), "Query".bold(), "Response".bold()]);

    for pair in messages.chunks(2) {
        let (query, response) = match pair {
            [q, r] => (q, Some(r)),
            [q] => (q, None),
            _ => continue,
        };
        let when = query
            .timestamp
            .as_deref()
            .map(format_timestamp)
            .unwrap_or_else(|| "-".to_string());
        table.add_row(row![
            when,
            truncate(&query.content, 40).cyan(),
            response.map(|r| truncate(&r.content, 60)).unwrap_or_default()
        ]);
    }
    table
}

fn truncate(text: &str, max_chars: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() > max_chars {
        let cut: String = single_line.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        single_line
    }
}

pub fn print_welcome_banner(app: &App, base_url: &str) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                 llmq Interactive Chat                        ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    println!("Backend: {}", base_url.cyan());
    let session = app.session();
    if session.is_logged_in() {
        println!("User:    {}", session.username().green());
    } else {
        println!("User:    {}", "not logged in (use /login or /register)".yellow());
    }
    if let Some(stats) = app.stats() {
        println!("Usage:   {}", format_stats_line(stats));
    }
    println!("\nType '/help' for available commands, 'exit' to quit\n");
}

/// Display login state, backend and usage for `/status`
pub fn print_status_display(app: &App, base_url: &str) {
    println!("\n{}", "Session Status".bold());
    println!("Backend:     {}", base_url);
    let session = app.session();
    if session.is_logged_in() {
        println!("User:        {}", session.username().green());
    } else {
        println!("User:        {}", "not logged in".yellow());
    }
    println!("Messages:    {}", app.transcript().len());
    match app.stats() {
        Some(stats) => println!("Usage:       {}", format_stats_line(stats)),
        None => println!("Usage:       {}", "unknown".dimmed()),
    }
    println!();
}
