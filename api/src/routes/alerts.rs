//! Caretaker alert endpoint.
//!
//! `POST /send_sms` takes a form naming a person and relays an alert SMS to
//! the caretaker.

use crate::state::AppState;
use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    routing::post,
    Form, Router,
};
use shared::models::{AlertRequest, SmsMessage};

type AlertResponse = (StatusCode, String);

/// Creates the alert routes.
pub fn alert_routes(state: AppState) -> Router {
    Router::new()
        .route("/send_sms", post(send_sms))
        .with_state(state)
}

/// Handler for alert requests.
///
/// Returns 200 with `Message sent to {number}` when the provider accepts the
/// message and 502 when the provider call fails.
///
/// Names longer than 100 characters are rejected with 422 before anything is
/// sent. This cap is a local choice, not a provider requirement.
async fn send_sms(
    State(state): State<AppState>,
    payload: Result<Form<AlertRequest>, FormRejection>,
) -> Result<AlertResponse, AlertResponse> {
    let request = match payload {
        Ok(Form(request)) => request,
        // No form body at all: same as a form without a name.
        Err(FormRejection::InvalidFormContentType(_)) => AlertRequest::default(),
        Err(rejection) => return Err((rejection.status(), rejection.body_text())),
    };

    if let Err(e) = request.validate_request() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, e.to_string()));
    }

    let message = SmsMessage::alert(state.from_number(), state.caretaker_number(), &request);

    match state.sms_sender().send(&message).await {
        Ok(receipt) => {
            tracing::info!(
                name = request.resolved_name(),
                to = %receipt.to,
                sid = %receipt.sid,
                "Alert SMS sent"
            );
            Ok((StatusCode::OK, format!("Message sent to {}", receipt.to)))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to send alert SMS");
            Err((StatusCode::BAD_GATEWAY, format!("Failed to send SMS: {e}")))
        }
    }
}
