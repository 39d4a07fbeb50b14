//! Caretaker Weekly Report
//!
//! Downloads the sensor CSV from Azure Blob Storage, draws sound level and
//! light intensity over time, and emails the chart to the caretaker on a
//! cron schedule.
//!
//! # Example
//!
//! ```no_run
//! use reporter::{run_once, ReportConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ReportConfig::from_env()?;
//!     let outcome = run_once(&config).await?;
//!     println!("sent {} readings", outcome.readings);
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod mail;
pub mod report;
pub mod scheduler;
pub mod storage;

pub use config::ReportConfig;
pub use report::{ReportError, ReportJob, ReportOutcome};
pub use scheduler::{Scheduler, TimerInfo};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use mail::SmtpMailer;
use std::sync::Arc;

fn build_job(config: &ReportConfig) -> Result<ReportJob> {
    let mailer = SmtpMailer::new(&config.smtp).context("Invalid SMTP settings")?;
    ReportJob::new(config, Arc::new(mailer)).context("Invalid storage settings")
}

/// Produces and sends the report once.
///
/// # Errors
///
/// Returns an error if the job cannot be built or any step of the run fails.
pub async fn run_once(config: &ReportConfig) -> Result<ReportOutcome> {
    let job = build_job(config)?;
    let outcome = job.run().await?;
    Ok(outcome)
}

/// Runs the report on its schedule until SIGTERM/SIGINT.
///
/// A failed run is logged and the scheduler keeps going.
///
/// # Errors
///
/// Returns an error if the job or the schedule cannot be built.
pub async fn run_scheduled(config: &ReportConfig) -> Result<()> {
    let job = Arc::new(build_job(config)?);
    let scheduler = Scheduler::new(&config.schedule, config.run_on_startup)
        .with_context(|| format!("Invalid schedule '{}'", config.schedule))?;

    tracing::info!(
        schedule = %config.schedule,
        run_on_startup = config.run_on_startup,
        output_dir = %job.output_dir().display(),
        "Report scheduler starting"
    );

    scheduler
        .run(
            |info: TimerInfo| {
                let job = Arc::clone(&job);
                async move {
                    tracing::info!(
                        at = %Utc::now(),
                        past_due = info.past_due,
                        "Report trigger fired"
                    );
                    match job.run().await {
                        Ok(outcome) => tracing::info!(
                            readings = outcome.readings,
                            recipient = %outcome.recipient,
                            "Report run complete"
                        ),
                        Err(e) => tracing::error!(error = %e, "Report run failed"),
                    }
                }
            },
            shutdown_signal(),
        )
        .await;

    tracing::info!("Report scheduler stopped");
    Ok(())
}

/// Validates the configuration and returns the next `count` firings.
///
/// # Errors
///
/// Returns an error if the storage connection, SMTP settings or schedule are invalid.
pub fn check(config: &ReportConfig, count: usize) -> Result<Vec<DateTime<Utc>>> {
    build_job(config)?;
    let scheduler = Scheduler::new(&config.schedule, config.run_on_startup)
        .with_context(|| format!("Invalid schedule '{}'", config.schedule))?;
    Ok(scheduler.upcoming(count))
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, stopping scheduler");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, stopping scheduler");
        }
    }
}
