//! Results Daemon - exam results lookup by seating number
//!
//! Provisions the results database on first run, then serves the search page.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use results_common::Config;
use resultsd::provision::ProvisionOutcome;
use resultsd::server;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "resultsd")]
#[command(about = "Exam results lookup service", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./results.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Provision the database if needed, then serve the search page (default)
    Serve,

    /// Provision the database and exit, for a separate pre-start step
    Provision,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!("resultsd v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let outcome = server::provision(&config)
        .await
        .context("Failed to provision results database")?;
    if let ProvisionOutcome::Downloaded { bytes } = outcome {
        info!("Results database ready ({} bytes)", bytes);
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Provision => {
            info!("Provisioning complete, exiting");
            Ok(())
        }
        Commands::Serve => server::run(&config).await,
    }
}
