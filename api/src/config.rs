//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::Result;
use shared::config::{ConfigError, Env};
use std::net::SocketAddr;
use std::time::Duration;

/// Default Twilio REST API base URL.
pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `CARETAKER_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `CARETAKER_PORT`: The port to listen on (default: 8080)
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `CARETAKER_PORT` is set but cannot be parsed as a valid port number
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_source(&Env::process())?)
    }

    /// Creates a new configuration from the given variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be parsed.
    pub fn from_source(env: &Env) -> Result<Self, ConfigError> {
        Ok(Self {
            host: env
                .optional("CARETAKER_HOST")
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env.parse_or("CARETAKER_PORT", 8080)?,
        })
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port combination is not a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Twilio credentials and the fixed alert numbers.
///
/// Configuration values are read from:
/// - `TWILIO_ACCOUNT_SID` (required)
/// - `TWILIO_AUTH_TOKEN` (required)
/// - `TWILIO_FROM_NUMBER` (required): sender number
/// - `CARETAKER_PHONE_NUMBER` (required): alert recipient
/// - `TWILIO_API_BASE`: API base URL (default: <https://api.twilio.com>)
/// - `TWILIO_TIMEOUT_SECS`: request timeout (default: 10)
#[derive(Clone)]
pub struct TwilioConfig {
    /// Account identifier.
    pub account_sid: String,
    /// Auth token.
    pub auth_token: String,
    /// Number alerts are sent from.
    pub from_number: String,
    /// Number alerts are sent to.
    pub caretaker_number: String,
    /// API base URL, without trailing slash.
    pub api_base: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl TwilioConfig {
    /// Loads the Twilio settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is invalid.
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_source(&Env::process())?)
    }

    /// Loads the Twilio settings from the given variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is invalid.
    pub fn from_source(env: &Env) -> Result<Self, ConfigError> {
        Ok(Self {
            account_sid: env.required("TWILIO_ACCOUNT_SID")?,
            auth_token: env.required("TWILIO_AUTH_TOKEN")?,
            from_number: env.required("TWILIO_FROM_NUMBER")?,
            caretaker_number: env.required("CARETAKER_PHONE_NUMBER")?,
            api_base: env
                .optional("TWILIO_API_BASE")
                .unwrap_or_else(|| DEFAULT_TWILIO_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout: Duration::from_secs(env.parse_or("TWILIO_TIMEOUT_SECS", 10)?),
        })
    }
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .field("caretaker_number", &self.caretaker_number)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}
