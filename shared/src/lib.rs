//! Caretaker Shared Library
//!
//! This crate contains the types and processing steps shared by the Caretaker
//! alert server and the weekly sensor report.
//!
//! # Modules
//!
//! - [`models`] - Sensor readings and alert payloads
//! - [`parser`] - CSV parsing of sensor exports
//! - [`chart`] - PNG line chart rendering
//! - [`config`] - Environment configuration helpers
//!
//! # Example
//!
//! ```
//! use shared::parser::parse_readings;
//!
//! let csv = "time,soundLevel,lightIntensity\n\
//!            2024-03-01 08:00:00,41.5,300\n\
//!            2024-03-01 09:00:00,39.0,280\n";
//!
//! let readings = parse_readings(csv).unwrap();
//! assert_eq!(readings.len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod chart;
pub mod config;
pub mod models;
pub mod parser;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use validator;
