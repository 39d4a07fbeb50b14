//! Liveness endpoint.
//!
//! `GET /health` (and `GET /` for platform routers that check the root path)
//! report that the alert server is up.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" if reachable.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Crate version.
    pub version: &'static str,
}

/// Creates the liveness routes.
pub fn health_routes() -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "caretaker-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}
