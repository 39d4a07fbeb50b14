//! Configuration helpers for Caretaker.
//!
//! Both binaries read their settings from environment variables. This module
//! provides the lookup and validation shared between them.

pub mod env;

pub use env::{ConfigError, Env};
