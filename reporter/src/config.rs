//! Reporter configuration module.
//!
//! Loads every setting of the weekly report from environment variables and
//! checks required values before any network call is made.

use crate::mail::{EmailSettings, SmtpSettings, SmtpTls, DEFAULT_SMTP_PORT};
use crate::scheduler::DEFAULT_SCHEDULE;
use lettre::message::Mailbox;
use shared::chart::ChartOptions;
use shared::config::{ConfigError, Env};
use std::path::PathBuf;
use std::time::Duration;

/// Default email subject.
pub const DEFAULT_SUBJECT: &str = "Graph from Azure Function";

/// Default email body.
pub const DEFAULT_BODY: &str = "Please find the attached graph.";

/// Where the sensor CSV lives.
#[derive(Clone)]
pub struct StorageSettings {
    /// Azure Storage connection string.
    pub connection_string: String,
    /// Container name.
    pub container: String,
    /// Blob name.
    pub blob: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSettings")
            .field("connection_string", &"<redacted>")
            .field("container", &self.container)
            .field("blob", &self.blob)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Complete reporter configuration.
///
/// Configuration values are read from:
/// - `AZURE_STORAGE_CONNECTION_STRING`, `AZURE_STORAGE_CONTAINER`, `AZURE_STORAGE_BLOB` (required)
/// - `STORAGE_TIMEOUT_SECS` (default: 30)
/// - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD` (required)
/// - `SMTP_PORT` (default: 587), `SMTP_TLS` (`starttls` or `none`, default: starttls),
///   `SMTP_TIMEOUT_SECS` (optional)
/// - `CARETAKER_EMAIL` (required), `REPORT_SENDER` (default: `SMTP_USERNAME`)
/// - `REPORT_SUBJECT`, `REPORT_BODY`
/// - `REPORT_SCHEDULE` (default: every Friday 08:00 UTC), `REPORT_RUN_ON_STARTUP` (default: true)
/// - `REPORT_OUTPUT_DIR` (default: system temp dir), `REPORT_FONT_PATH` (default:
///   the bundled DejaVu Sans), `REPORT_SORT_READINGS` (default: true)
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Blob location and access.
    pub storage: StorageSettings,
    /// SMTP server.
    pub smtp: SmtpSettings,
    /// Email envelope and text.
    pub email: EmailSettings,
    /// Cron expression (seconds first).
    pub schedule: String,
    /// Run once immediately when the scheduler starts.
    pub run_on_startup: bool,
    /// Directory per-run chart files are written to.
    pub output_dir: PathBuf,
    /// Chart appearance.
    pub chart: ChartOptions,
    /// Sort readings by time before charting.
    pub sort_readings: bool,
}

fn invalid(name: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

impl ReportConfig {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&Env::process())
    }

    /// Loads the configuration from the given variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is invalid.
    pub fn from_source(env: &Env) -> Result<Self, ConfigError> {
        let storage = StorageSettings {
            connection_string: env.required("AZURE_STORAGE_CONNECTION_STRING")?,
            container: env.required("AZURE_STORAGE_CONTAINER")?,
            blob: env.required("AZURE_STORAGE_BLOB")?,
            timeout: Duration::from_secs(env.parse_or("STORAGE_TIMEOUT_SECS", 30)?),
        };

        let smtp = SmtpSettings {
            host: env.required("SMTP_HOST")?,
            port: env.parse_or("SMTP_PORT", DEFAULT_SMTP_PORT)?,
            username: env.required("SMTP_USERNAME")?,
            password: env.required("SMTP_PASSWORD")?,
            tls: env.parse_or("SMTP_TLS", SmtpTls::StartTls)?,
            timeout: env
                .optional("SMTP_TIMEOUT_SECS")
                .map(|raw| raw.parse::<u64>().map(Duration::from_secs))
                .transpose()
                .map_err(|e| invalid("SMTP_TIMEOUT_SECS", e))?,
        };

        let email = EmailSettings {
            sender: env
                .optional("REPORT_SENDER")
                .unwrap_or_else(|| smtp.username.clone()),
            recipient: env.required("CARETAKER_EMAIL")?,
            subject: env
                .optional("REPORT_SUBJECT")
                .unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            body: env
                .optional("REPORT_BODY")
                .unwrap_or_else(|| DEFAULT_BODY.to_string()),
        };
        email
            .sender
            .parse::<Mailbox>()
            .map_err(|e| invalid("REPORT_SENDER", e))?;
        email
            .recipient
            .parse::<Mailbox>()
            .map_err(|e| invalid("CARETAKER_EMAIL", e))?;

        let schedule = env
            .optional("REPORT_SCHEDULE")
            .unwrap_or_else(|| DEFAULT_SCHEDULE.to_string());
        crate::scheduler::parse_schedule(&schedule).map_err(|e| invalid("REPORT_SCHEDULE", e))?;

        let font_path = env.optional("REPORT_FONT_PATH").map(PathBuf::from);
        if font_path.as_ref().is_some_and(|path| !path.is_file()) {
            return Err(invalid("REPORT_FONT_PATH", "file does not exist"));
        }

        Ok(Self {
            storage,
            smtp,
            email,
            schedule,
            run_on_startup: env.flag_or("REPORT_RUN_ON_STARTUP", true)?,
            output_dir: env
                .optional("REPORT_OUTPUT_DIR")
                .map_or_else(std::env::temp_dir, PathBuf::from),
            chart: ChartOptions {
                font_path,
                ..ChartOptions::default()
            },
            sort_readings: env.flag_or("REPORT_SORT_READINGS", true)?,
        })
    }
}
