//! API route definitions.
//!
//! This module organizes all HTTP routes for the Caretaker API server.

mod alerts;
mod health;

pub use alerts::alert_routes;
pub use health::health_routes;
