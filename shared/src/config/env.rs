//! Environment variable lookup with presence and format validation.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("Missing required configuration variable {0}")]
    Missing(String),

    /// A variable is set but cannot be used.
    #[error("Invalid value for {name}: {reason}")]
    Invalid {
        /// Variable name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// A source of configuration variables.
///
/// Reads the process environment by default; tests build one from fixed pairs
/// so they never touch global state.
///
/// # Example
///
/// ```
/// use shared::config::Env;
///
/// let env = Env::from_pairs([("SMTP_PORT", "2525")]);
/// assert_eq!(env.parse_or("SMTP_PORT", 587_u16).unwrap(), 2525);
/// assert_eq!(env.parse_or("MISSING", 587_u16).unwrap(), 587);
/// assert!(env.required("SMTP_HOST").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Env {
    overrides: Option<HashMap<String, String>>,
}

impl Env {
    /// Reads from the process environment.
    #[must_use]
    pub fn process() -> Self {
        Self { overrides: None }
    }

    /// Reads only from the given pairs.
    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            overrides: Some(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Returns the trimmed value, treating blank values as unset.
    #[must_use]
    pub fn optional(&self, name: &str) -> Option<String> {
        let value = match &self.overrides {
            Some(map) => map.get(name).cloned(),
            None => std::env::var(name).ok(),
        };
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Returns the value of a variable that must be set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if the variable is unset or blank.
    pub fn required(&self, name: &str) -> Result<String, ConfigError> {
        self.optional(name)
            .ok_or_else(|| ConfigError::Missing(name.to_string()))
    }

    /// Parses a variable, falling back to `default` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the variable is set but unparsable.
    pub fn parse_or<T>(&self, name: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(name) {
            Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                name: name.to_string(),
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    /// Reads a boolean flag (`true/false`, `1/0`, `yes/no`, `on/off`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for any other value.
    pub fn flag_or(&self, name: &str, default: bool) -> Result<bool, ConfigError> {
        let Some(raw) = self.optional(name) else {
            return Ok(default);
        };
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                name: name.to_string(),
                reason: format!("expected a boolean, got '{raw}'"),
            }),
        }
    }
}
