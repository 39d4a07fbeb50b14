//! Alert data models.
//!
//! Defines the inbound `AlertRequest` form payload and the outbound
//! `SmsMessage` relayed to the caretaker.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// Name used when the request does not name anyone.
pub const DEFAULT_ALERT_NAME: &str = "User";

/// Form payload of an alert request.
///
/// `name` is limited to 100 characters. The limit is local to this service;
/// the alert sentence itself puts no bound on it.
///
/// # Example
///
/// ```
/// use shared::models::AlertRequest;
///
/// let request = AlertRequest::named("Alice");
/// assert_eq!(request.resolved_name(), "Alice");
/// assert_eq!(AlertRequest::default().resolved_name(), "User");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AlertRequest {
    /// Name of the person in the unsafe environment.
    #[serde(default)]
    #[validate(length(max = 100, message = "Name cannot exceed 100 characters"))]
    pub name: Option<String>,
}

/// Errors that can occur during alert request validation.
#[derive(Debug, Error)]
pub enum AlertValidationError {
    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl AlertRequest {
    /// Creates a request naming the given person.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// Returns the trimmed name, or [`DEFAULT_ALERT_NAME`] when absent or blank.
    #[must_use]
    pub fn resolved_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_ALERT_NAME)
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the name exceeds 100 characters.
    pub fn validate_request(&self) -> Result<(), AlertValidationError> {
        self.validate()?;
        Ok(())
    }
}

/// Builds the alert sentence sent to the caretaker.
#[must_use]
pub fn alert_body(name: &str) -> String {
    format!("\nAttend to {name} NOW!! \nThe environment they're in is unsafe.")
}

/// An outbound SMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsMessage {
    /// Sender phone number.
    pub from: String,
    /// Recipient phone number.
    pub to: String,
    /// Message text.
    pub body: String,
}

impl SmsMessage {
    /// Builds the alert SMS for a request.
    ///
    /// # Example
    ///
    /// ```
    /// use shared::models::{AlertRequest, SmsMessage};
    ///
    /// let sms = SmsMessage::alert("+15550001", "+15550002", &AlertRequest::named("Alice"));
    /// assert!(sms.body.contains("Attend to Alice NOW!!"));
    /// ```
    #[must_use]
    pub fn alert(from: impl Into<String>, to: impl Into<String>, request: &AlertRequest) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            body: alert_body(request.resolved_name()),
        }
    }
}
