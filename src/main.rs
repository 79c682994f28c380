//! llmq - terminal client for the LLM query service
//!
#![doc = "llmq - terminal client for the LLM query service"]
#![doc = "Main entry point for the llmq command-line application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use llmq::cli::{Cli, Commands};
use llmq::commands;
use llmq::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat => {
            commands::chat::run_chat(config).await?;
            Ok(())
        }
        Commands::Login { username, password } => {
            tracing::info!("Logging in as {}", username);
            commands::auth::login(config, username, password).await?;
            Ok(())
        }
        Commands::Register {
            username,
            email,
            password,
        } => {
            tracing::info!("Registering {}", username);
            commands::auth::register(config, username, email, password).await?;
            Ok(())
        }
        Commands::Logout => {
            commands::auth::logout(config).await?;
            Ok(())
        }
        Commands::Ask { query } => {
            commands::ask::run_ask(config, query.join(" ")).await?;
            Ok(())
        }
        Commands::Stats { json } => {
            commands::stats::show_stats(config, json).await?;
            Ok(())
        }
        Commands::History { limit, json } => {
            if let Some(n) = limit {
                tracing::debug!("Using history limit override: {}", n);
            }
            commands::history::show_history(config, limit, json).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber
///
/// `RUST_LOG` wins over the defaults; `--json-logs` swaps the human-readable
/// layer for JSON lines. Logs go to stderr so command output stays clean.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "llmq=debug" } else { "llmq=warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
