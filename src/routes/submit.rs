//! Public submission endpoint.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    routing::post,
};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::error;

use crate::email::ConfirmationEmail;
use crate::engine::EngineError;
use crate::limits::MAX_BODY_BYTES;
use crate::model::short_ref;
use crate::observability;
use crate::rate_limit::{RateDecision, limit_message};
use crate::routes::ApiError;
use crate::state::AppState;
use crate::validation::{INVALID_BODY, SubmitBody, parse_submission};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/submit", post(submit))
}

/// POST /api/submit - Accept a new help request
async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.contains("application/json") {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Content-Type must be application/json.",
        ));
    }

    if body.len() > MAX_BODY_BYTES {
        return Err(ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "Request body too large.",
        ));
    }

    let parsed: SubmitBody = serde_json::from_str(&body)
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, INVALID_BODY))?;
    let request = parse_submission(parsed, Utc::now().date_naive())
        .map_err(|msg| ApiError::new(StatusCode::BAD_REQUEST, msg))?;

    if let RateDecision::Limited { retry_after_secs } = state.limiter.check(&client_key(&headers)) {
        metrics::counter!(observability::RATE_LIMITED_TOTAL).increment(1);
        return Err(
            ApiError::new(StatusCode::TOO_MANY_REQUESTS, limit_message(retry_after_secs))
                .with_retry_after(retry_after_secs),
        );
    }

    let booking = match state.engine.submit(request).await {
        Ok(booking) => booking,
        Err(EngineError::SlotTaken) => {
            metrics::counter!(observability::SLOT_CONFLICTS_TOTAL).increment(1);
            return Err(ApiError::new(
                StatusCode::CONFLICT,
                "This date and time slot is no longer available. Please choose another date or time.",
            ));
        }
        Err(e) => {
            error!("submit failed: {e}");
            return Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save request.",
            ));
        }
    };

    metrics::counter!(observability::SUBMISSIONS_TOTAL).increment(1);

    let id = booking.id;
    let email = ConfirmationEmail {
        to: booking.email.clone(),
        name: booking.name.clone(),
        request_ref: short_ref(booking.id),
        submitted_on: booking.created_at.format("%b %-d, %Y").to_string(),
        appointment_date: booking.appointment_date,
        appointment_time_slot: booking.appointment_time_slot.clone(),
        appointment_preference: booking.appointment_preference.clone(),
        instagram_handle: booking.instagram_handle.clone(),
        reschedule_link: booking.reschedule_token.map(|t| state.reschedule_link(t)),
    };
    let mailer = state.mailer.clone();
    let notifier = state.notifier.clone();
    tokio::spawn(async move {
        mailer.send_confirmation(email).await;
        notifier.new_request(&booking).await;
    });

    Ok(Json(json!({ "id": id, "ok": true })))
}

/// Rate-limit key: first hop of `x-forwarded-for`, then `x-real-ip`.
fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .unwrap_or("unknown")
        .to_string()
}
