//! Ledger CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::CliConfig;

#[derive(Parser, Debug)]
#[command(name = "ledger", version)]
#[command(about = "Hash, sign and assemble purchase ledger records", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "LEDGER_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, overrides the configured one
    #[arg(long, env = "LEDGER_LOG")]
    log: Option<String>,

    /// Print compact JSON
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: commands::Command,
}

fn init_tracing(config: &CliConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_filter)
        .with_context(|| format!("Invalid log filter `{}`", config.log_filter))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CliConfig::load_from_file(path)?,
        None => CliConfig::default(),
    };
    if let Some(filter) = cli.log {
        config = config.with_log_filter(filter);
    }
    if cli.compact {
        config = config.with_pretty(false);
    }
    config.validate()?;

    init_tracing(&config)?;
    tracing::debug!(?config, "configuration loaded");

    commands::run(cli.command, &config).await
}
