//! Availability lookup for the booking calendar.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use ulid::Ulid;

use crate::routes::ApiError;
use crate::state::AppState;
use crate::validation::parse_date_only;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/appointment-slots", get(taken_slots))
}

#[derive(Deserialize)]
struct SlotsQuery {
    date: Option<String>,
    token: Option<String>,
}

/// GET /api/appointment-slots?date=YYYY-MM-DD&token=... - Slots already taken
/// on a date. The optional reschedule token keeps the caller's own slot out
/// of the list so it stays selectable.
async fn taken_slots(
    State(state): State<AppState>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, ApiError> {
    let date: String = query
        .date
        .as_deref()
        .unwrap_or("")
        .trim()
        .chars()
        .take(10)
        .collect();
    let Some(date) = parse_date_only(&date) else {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Valid date (YYYY-MM-DD) is required.",
        ));
    };

    // An unparseable token matches no request, so it simply excludes nothing.
    let exclude = query
        .token
        .as_deref()
        .and_then(|t| Ulid::from_string(t.trim()).ok());

    let taken = state.engine.taken_slots(date, exclude).await;
    Ok(Json(json!({ "taken": taken })))
}
