//! The weekly report job: fetch, parse, chart, email.

use crate::config::ReportConfig;
use crate::mail::{build_message, DeliveryError, EmailSettings, Mailer};
use crate::storage::{BlobClient, FetchError, StorageConnection};
use shared::chart::{render_chart, ChartOptions, RenderError};
use shared::models::sort_by_time;
use shared::parser::{parse_readings, ParseError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors that abort a report run.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The CSV could not be downloaded.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The CSV could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The chart could not be drawn.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The email could not be built or sent.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// The chart file could not be written or read back.
    #[error("Chart file error: {0}")]
    Io(#[from] std::io::Error),

    /// The rendering task panicked or was cancelled.
    #[error("Rendering task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    /// Number of readings charted.
    pub readings: usize,
    /// Address the report was sent to.
    pub recipient: String,
}

/// Removes the chart file when dropped.
struct ChartFile(PathBuf);

impl Drop for ChartFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.0.display(), error = %e, "Failed to remove chart file"),
        }
    }
}

/// Produces and sends the sensor report.
///
/// Runs are serialized: a second `run` waits for the first to finish.
pub struct ReportJob {
    blob: BlobClient,
    container: String,
    blob_name: String,
    mailer: Arc<dyn Mailer>,
    email: EmailSettings,
    chart: ChartOptions,
    output_dir: PathBuf,
    sort_readings: bool,
    lock: Mutex<()>,
}

impl ReportJob {
    /// Creates a job from the configuration and a mail transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage connection string is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: &ReportConfig, mailer: Arc<dyn Mailer>) -> Result<Self, ReportError> {
        let connection = StorageConnection::parse(&config.storage.connection_string)?;
        let blob = BlobClient::new(connection, config.storage.timeout)?;

        Ok(Self {
            blob,
            container: config.storage.container.clone(),
            blob_name: config.storage.blob.clone(),
            mailer,
            email: config.email.clone(),
            chart: config.chart.clone(),
            output_dir: config.output_dir.clone(),
            sort_readings: config.sort_readings,
            lock: Mutex::new(()),
        })
    }

    /// Directory chart files are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Runs the report once.
    ///
    /// The chart is written to a file unique to this run and removed
    /// afterwards, whether or not the email was sent.
    ///
    /// # Errors
    ///
    /// Returns the first failing step. Nothing is sent if fetching, parsing
    /// or rendering fails.
    pub async fn run(&self) -> Result<ReportOutcome, ReportError> {
        let _guard = self.lock.lock().await;

        let csv = self.blob.download_text(&self.container, &self.blob_name).await?;
        let mut readings = parse_readings(&csv)?;
        if self.sort_readings {
            sort_by_time(&mut readings);
        }
        tracing::info!(readings = readings.len(), "Parsed sensor readings");

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let chart_file = ChartFile(
            self.output_dir
                .join(format!("chart-{}.png", uuid::Uuid::new_v4())),
        );

        let count = readings.len();
        let path = chart_file.0.clone();
        let options = self.chart.clone();
        tokio::task::spawn_blocking(move || render_chart(&readings, &path, &options)).await??;
        tracing::debug!(path = %chart_file.0.display(), "Rendered chart");

        let png = tokio::fs::read(&chart_file.0).await?;
        let message = build_message(&self.email, png)?;
        self.mailer.send(message).await?;

        tracing::info!(recipient = %self.email.recipient, "Report email sent");
        Ok(ReportOutcome {
            readings: count,
            recipient: self.email.recipient.clone(),
        })
    }
}
