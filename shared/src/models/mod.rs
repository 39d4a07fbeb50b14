//! Data models for the Caretaker flows.
//!
//! This module contains the sensor readings consumed by the weekly report and
//! the alert payloads handled by the SMS endpoint.

pub mod alert;
pub mod reading;

pub use alert::{AlertRequest, AlertValidationError, SmsMessage, DEFAULT_ALERT_NAME};
pub use reading::{sort_by_time, SensorReading};
