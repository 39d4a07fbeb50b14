//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use crate::sms::SmsSender;
use std::sync::Arc;

/// Application state shared across all request handlers.
///
/// Holds the SMS relay and the fixed numbers every alert is sent between.
/// Nothing in it is mutable, so concurrent requests need no coordination.
#[derive(Clone)]
pub struct AppState {
    /// The SMS provider client.
    sms_sender: Arc<dyn SmsSender>,
    /// Number alerts are sent from.
    from_number: String,
    /// Number alerts are sent to.
    caretaker_number: String,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        sms_sender: Arc<dyn SmsSender>,
        from_number: impl Into<String>,
        caretaker_number: impl Into<String>,
    ) -> Self {
        Self {
            sms_sender,
            from_number: from_number.into(),
            caretaker_number: caretaker_number.into(),
        }
    }

    /// Returns a reference to the SMS sender.
    #[must_use]
    pub fn sms_sender(&self) -> &dyn SmsSender {
        self.sms_sender.as_ref()
    }

    /// Returns the sender number.
    #[must_use]
    pub fn from_number(&self) -> &str {
        &self.from_number
    }

    /// Returns the caretaker's number.
    #[must_use]
    pub fn caretaker_number(&self) -> &str {
        &self.caretaker_number
    }
}
