//! Caretaker API Server
//!
//! This crate provides the HTTP server for caretaker alerts. A `POST /send_sms`
//! naming a person relays an SMS to the caretaker's phone through Twilio.
//!
//! # Architecture
//!
//! The API server is built on Axum and Tokio, providing:
//! - `POST /send_sms` for alert relay
//! - `GET /health` for liveness checks
//!
//! # Example
//!
//! ```no_run
//! use api::run_server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_server().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
mod routes;
pub mod sms;
mod state;

pub use config::{Config, TwilioConfig, DEFAULT_TWILIO_API_BASE};
pub use state::AppState;

use anyhow::{Context, Result};
use axum::Router;
use sms::TwilioClient;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Runs the Caretaker API server.
///
/// This function reads configuration from environment variables and starts
/// listening for incoming connections. It handles graceful shutdown on
/// SIGTERM/SIGINT signals.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server() -> Result<()> {
    let config = Config::from_env().context("Invalid server configuration")?;
    let twilio = TwilioConfig::from_env().context("Invalid Twilio configuration")?;
    let from_number = twilio.from_number.clone();
    let caretaker_number = twilio.caretaker_number.clone();
    let sender = TwilioClient::new(twilio).context("Failed to build Twilio client")?;

    let state = AppState::new(Arc::new(sender), from_number, caretaker_number);
    run_server_with_config(config, state).await
}

/// Runs the Caretaker API server with the provided configuration and state.
///
/// This is useful for testing or when you want to provide configuration programmatically.
///
/// # Errors
///
/// Returns an error if:
/// - The configured address is invalid
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server_with_config(config: Config, state: AppState) -> Result<()> {
    let addr = config.socket_addr()?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        caretaker = %state.caretaker_number(),
        "Caretaker API server starting"
    );

    let app = create_router(state);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(%addr, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Creates the main application router with all routes and middleware.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .merge(routes::alert_routes(state))
        .layer(TraceLayer::new_for_http())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
