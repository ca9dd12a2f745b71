//! Slack relay: webhook server answering Slack messages with an LLM.
//!
//! Usage:
//!   slack-relay serve        Start the webhook server
//!   slack-relay check        Report missing configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use slack_relay::config::{self, RelayConfig};
use slack_relay::server::{self, AppState};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "slack-relay")]
#[command(version = "0.1.0")]
#[command(about = "Slack webhook relay backed by a tool-using language model")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to an optional TOML config file.
    #[arg(long, default_value = "relay.toml")]
    config: PathBuf,

    /// Log level (debug, info, warn, error). Overrides the config file.
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook server.
    Serve,

    /// Check configuration and report missing values.
    Check,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(Some(cli.config.as_path()))
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    // Initialize logging
    let level = cli.log_level.clone().unwrap_or_else(|| cfg.log_level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve => cmd_serve(cfg).await,
        Commands::Check => cmd_check(&cfg),
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

async fn cmd_serve(cfg: RelayConfig) -> Result<()> {
    let missing = cfg.missing_required();
    if missing.is_empty() {
        info!("All required environment variables are set");
    } else {
        warn!("Missing environment variables: {}", missing.join(", "));
        warn!("Requests will be rejected or fail until these are set");
    }

    tokio::fs::create_dir_all(cfg.resolved_files_dir())
        .await
        .with_context(|| {
            format!("Failed to create files directory {}", cfg.resolved_files_dir())
        })?;

    println!(
        "{} Starting Slack relay on {}:{} (model: {})",
        ">>>".green().bold(),
        cfg.host,
        cfg.port,
        cfg.model,
    );

    let state = AppState::from_config(&cfg);
    let cancel = CancellationToken::new();

    let server_cancel = cancel.clone();
    let server_cfg = cfg.clone();
    let mut server_handle =
        tokio::spawn(async move { server::serve(&server_cfg, state, server_cancel).await });

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("Failed to listen for Ctrl+C")?;
            println!("\n{} Shutting down gracefully...", "<<<".red().bold());
            cancel.cancel();
        }
        // Bind failures and server errors end the process directly.
        joined = &mut server_handle => {
            return joined.context("Server task failed")?;
        }
    }

    // In-flight answers get a bounded grace period.
    let shutdown_timeout = tokio::time::Duration::from_secs(10);
    match tokio::time::timeout(shutdown_timeout, server_handle).await {
        Ok(Ok(result)) => result?,
        Ok(Err(e)) => warn!("Server task join error: {}", e),
        Err(_) => warn!("Server did not stop within {:?}", shutdown_timeout),
    }

    info!("Shutdown complete");
    Ok(())
}

fn cmd_check(cfg: &RelayConfig) -> Result<()> {
    println!();
    println!("{}", "=== Slack Relay Configuration ===".bold());
    println!();
    println!("  {}:    {}:{}", "Listen".bold(), cfg.host, cfg.port);
    println!("  {}:     {} ({})", "Model".bold(), cfg.model, cfg.model_api_url);
    println!("  {}:     {}", "Files".bold(), cfg.resolved_files_dir());
    println!(
        "  {}:   {}",
        "Mention".bold(),
        if cfg.require_mention { "required" } else { "not required" }
    );
    println!();

    let checks = [
        (config::ENV_BOT_TOKEN, !cfg.slack_bot_token.is_empty()),
        (config::ENV_SIGNING_SECRET, !cfg.slack_signing_secret.is_empty()),
        (config::ENV_API_KEY, !cfg.model_api_key.is_empty()),
        (config::ENV_BOT_USER_ID, !cfg.slack_bot_user_id.is_empty()),
    ];
    for (name, present) in checks {
        let mark = if present { "set".green() } else { "missing".red() };
        println!("  {:<22} {}", name, mark);
    }
    println!();

    let missing = cfg.missing_required();
    if missing.is_empty() {
        println!("{} All required environment variables are set", "OK".green().bold());
        Ok(())
    } else {
        eprintln!(
            "{} Missing environment variables: {}",
            "Error:".red().bold(),
            missing.join(", ")
        );
        std::process::exit(1);
    }
}
