//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality used across all integration tests,
//! including an in-process stand-in for the Twilio API and HTTP request helpers.

use api::sms::TwilioClient;
use api::{create_router, AppState, TwilioConfig};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::routing::post;
use axum::{Form, Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const ACCOUNT_SID: &str = "AC00000000000000000000000000000001";
pub const AUTH_TOKEN: &str = "integration-token";
pub const FROM_NUMBER: &str = "+15550000001";
pub const CARETAKER_NUMBER: &str = "+15550000002";

/// A message creation request as seen by the mock provider.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    /// Account SID from the URL path.
    pub account_sid: String,
    /// Raw `Authorization` header.
    pub authorization: Option<String>,
    /// Decoded form fields.
    pub form: HashMap<String, String>,
}

#[derive(Clone)]
struct MockProvider {
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    failure: Option<(StatusCode, Value)>,
}

async fn create_message(
    State(mock): State<MockProvider>,
    Path(account_sid): Path<String>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let to = form.get("To").cloned().unwrap_or_default();
    mock.captured.lock().unwrap().push(CapturedRequest {
        account_sid,
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        form,
    });

    if let Some((status, body)) = mock.failure.clone() {
        return (status, Json(body));
    }

    (
        StatusCode::CREATED,
        Json(json!({
            "sid": "SM00000000000000000000000000000001",
            "to": to,
            "status": "queued"
        })),
    )
}

/// Starts a mock Twilio API on an ephemeral port.
///
/// # Returns
///
/// The base URL of the mock and the list it records requests into.
pub async fn spawn_provider(
    failure: Option<(StatusCode, Value)>,
) -> (String, Arc<Mutex<Vec<CapturedRequest>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let mock = MockProvider {
        captured: Arc::clone(&captured),
        failure,
    };

    let app = Router::new()
        .route(
            "/2010-04-01/Accounts/{sid}/Messages.json",
            post(create_message),
        )
        .with_state(mock);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), captured)
}

/// Twilio configuration pointing at the given API base.
pub fn twilio_config(api_base: &str) -> TwilioConfig {
    TwilioConfig {
        account_sid: ACCOUNT_SID.to_string(),
        auth_token: AUTH_TOKEN.to_string(),
        from_number: FROM_NUMBER.to_string(),
        caretaker_number: CARETAKER_NUMBER.to_string(),
        api_base: api_base.to_string(),
        timeout: Duration::from_secs(5),
    }
}

/// Creates a test router whose alerts go to the given API base.
pub fn test_app(api_base: &str) -> Router {
    let client = TwilioClient::new(twilio_config(api_base)).unwrap();
    let state = AppState::new(Arc::new(client), FROM_NUMBER, CARETAKER_NUMBER);
    create_router(state)
}

/// Helper to make a POST request with a form-encoded body.
///
/// # Returns
///
/// A tuple containing the response status code and the response body text.
pub async fn post_form(app: Router, uri: &str, body: &str) -> (StatusCode, String) {
    let response = tower::ServiceExt::oneshot(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&body_bytes).into_owned())
}

/// Helper to make a GET request.
///
/// # Returns
///
/// A tuple containing the response status code and parsed JSON response body.
pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = tower::ServiceExt::oneshot(
        app,
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}
