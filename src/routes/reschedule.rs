//! Self-service rescheduling via emailed token links.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;
use ulid::Ulid;

use crate::email::AppointmentChangedEmail;
use crate::engine::{EngineError, Reschedule};
use crate::limits::MAX_TIME_SLOT_LEN;
use crate::observability;
use crate::routes::ApiError;
use crate::slots::is_valid_slot;
use crate::state::AppState;
use crate::validation::parse_date_only;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/reschedule", get(lookup).post(change))
}

const INVALID_LINK: &str = "Invalid or missing link.";
const EXPIRED_LINK: &str = "Invalid or expired link.";
const NO_APPOINTMENT: &str = "This request does not have an appointment to change.";

#[derive(Deserialize)]
struct LookupQuery {
    token: Option<String>,
}

/// GET /api/reschedule?token=... - Current appointment behind a token link
async fn lookup(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<Value>, ApiError> {
    let token = query.token.as_deref().unwrap_or("").trim().to_string();
    if token.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, INVALID_LINK));
    }
    let booking = match Ulid::from_string(&token) {
        Ok(token) => state.engine.find_by_token(token).await,
        Err(_) => None,
    };
    let Some(booking) = booking else {
        return Err(ApiError::new(StatusCode::NOT_FOUND, EXPIRED_LINK));
    };

    let (Some(date), Some(slot), true) = (
        booking.appointment_date,
        booking.appointment_time_slot,
        booking.wants_appointment,
    ) else {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, NO_APPOINTMENT));
    };

    Ok(Json(json!({
        "name": booking.name,
        "appointment_date": date,
        "appointment_time_slot": slot,
    })))
}

#[derive(Deserialize, Default)]
struct ChangeBody {
    token: Option<String>,
    appointment_date: Option<String>,
    appointment_time_slot: Option<String>,
}

/// POST /api/reschedule - Move the appointment to a new date and slot
async fn change(State(state): State<AppState>, body: String) -> Result<Json<Value>, ApiError> {
    let body: ChangeBody = serde_json::from_str(&body)
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "Invalid request."))?;

    let token = body.token.as_deref().unwrap_or("").trim().to_string();
    let date: String = body
        .appointment_date
        .as_deref()
        .unwrap_or("")
        .trim()
        .chars()
        .take(10)
        .collect();
    let slot: String = body
        .appointment_time_slot
        .as_deref()
        .unwrap_or("")
        .trim()
        .chars()
        .take(MAX_TIME_SLOT_LEN)
        .collect();

    if token.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, INVALID_LINK));
    }
    let Some(date) = parse_date_only(&date) else {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Please select a valid date.",
        ));
    };
    if date < Utc::now().date_naive() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Appointment date must be today or a future date.",
        ));
    }
    if !is_valid_slot(&slot) {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Please select a valid time slot.",
        ));
    }

    let token = Ulid::from_string(&token)
        .map_err(|_| ApiError::new(StatusCode::NOT_FOUND, EXPIRED_LINK))?;

    match state.engine.reschedule(token, date, &slot).await {
        Ok(Reschedule::Unchanged { .. }) => Ok(Json(json!({
            "ok": true,
            "message": "Your appointment is already set for this date and time.",
        }))),
        Ok(Reschedule::Changed {
            booking,
            previous_date,
            previous_slot,
        }) => {
            metrics::counter!(observability::RESCHEDULES_TOTAL).increment(1);

            let email = AppointmentChangedEmail {
                to: booking.email.clone(),
                name: booking.name.clone(),
                appointment_date: date,
                appointment_time_slot: slot,
            };
            let mailer = state.mailer.clone();
            let notifier = state.notifier.clone();
            tokio::spawn(async move {
                mailer.send_appointment_changed(email).await;
                let previous = previous_date.zip(previous_slot.as_deref());
                notifier.appointment_changed(&booking, previous).await;
            });

            Ok(Json(json!({
                "ok": true,
                "message": "Your appointment has been changed. Check your email for confirmation.",
            })))
        }
        Err(EngineError::TokenNotFound) => Err(ApiError::new(StatusCode::NOT_FOUND, EXPIRED_LINK)),
        Err(EngineError::Validation(msg)) => Err(ApiError::new(StatusCode::BAD_REQUEST, msg)),
        Err(EngineError::SlotTaken) => {
            metrics::counter!(observability::SLOT_CONFLICTS_TOTAL).increment(1);
            Err(ApiError::new(
                StatusCode::CONFLICT,
                "This date and time slot is no longer available. Please choose another.",
            ))
        }
        Err(e) => {
            error!("reschedule failed: {e}");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update appointment.",
            ))
        }
    }
}
