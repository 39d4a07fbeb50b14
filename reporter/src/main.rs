//! Caretaker Report Binary
//!
//! Sends the weekly sensor chart email.
//!
//! # Usage
//!
//! ```bash
//! caretaker-report            # run on the configured schedule
//! caretaker-report run        # send one report now
//! caretaker-report check -n 5 # validate settings, show the next 5 firings
//! ```

#![deny(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reporter::ReportConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Caretaker weekly report - emails a chart of the latest sensor readings
#[derive(Parser)]
#[command(name = "caretaker-report")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Load environment variables from this file instead of `.env`
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one report now and exit
    Run,
    /// Run on the configured schedule until stopped (default)
    Schedule {
        /// Skip the run at startup
        #[arg(long)]
        no_startup_run: bool,
    },
    /// Validate the configuration and print upcoming firings
    Check {
        /// Number of firings to print
        #[arg(short = 'n', long, default_value_t = 3)]
        count: usize,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let dotenv = match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            Some(path.clone())
        }
        None => dotenvy::dotenv().ok(),
    };

    init_tracing();

    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    let mut config = ReportConfig::from_env().context("Invalid report configuration")?;

    match cli.command.unwrap_or(Commands::Schedule {
        no_startup_run: false,
    }) {
        Commands::Run => {
            let outcome = reporter::run_once(&config).await?;
            tracing::info!(
                readings = outcome.readings,
                recipient = %outcome.recipient,
                "Report sent"
            );
        }
        Commands::Schedule { no_startup_run } => {
            if no_startup_run {
                config.run_on_startup = false;
            }
            reporter::run_scheduled(&config).await?;
        }
        Commands::Check { count } => {
            let upcoming = reporter::check(&config, count)?;
            println!("Configuration OK");
            println!("Schedule: {}", config.schedule);
            for fire in upcoming {
                println!("  {}", fire.to_rfc3339());
            }
        }
    }

    Ok(())
}
