//! Integration tests for the liveness endpoint.

use axum::http::StatusCode;

use super::common::{get, spawn_provider, test_app};

#[tokio::test]
async fn test_health_check() {
    let (base, captured) = spawn_provider(None).await;
    let app = test_app(&base);

    let (status, response) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["service"], "caretaker-api");

    // Liveness never reaches the provider.
    assert!(captured.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let (base, _captured) = spawn_provider(None).await;
    let app = test_app(&base);

    let (status, _) = get(app, "/api/v1/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
