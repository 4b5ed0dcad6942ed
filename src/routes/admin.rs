//! Admin dashboard endpoints, guarded by `ADMIN_SECRET`.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;
use ulid::Ulid;

use crate::email::ZoomLinkEmail;
use crate::engine::EngineError;
use crate::limits::{MAX_INTERNAL_NOTES_LEN, MAX_ZOOM_LINK_LEN};
use crate::model::Booking;
use crate::observability;
use crate::routes::{ApiError, check_admin, check_admin_header, unauthorized};
use crate::state::AppState;
use crate::zoom::MeetingRequest;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/requests", get(list))
        .route(
            "/api/requests/{id}",
            get(show).patch(update).delete(remove),
        )
        .route("/api/requests/{id}/create-zoom-meeting", post(create_zoom_meeting))
}

const NOT_FOUND: &str = "Request not found.";

#[derive(Deserialize)]
struct AuthQuery {
    secret: Option<String>,
}

/// GET /api/requests - All requests, newest first
async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    if !check_admin_header(&state, &headers) {
        return Err(unauthorized());
    }
    let requests = state.engine.list_all().await;
    Ok(Json(json!({ "requests": requests })))
}

/// GET /api/requests/:id - One request
async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<Booking>, ApiError> {
    if !check_admin(&state, &headers, query.secret.as_deref()) {
        return Err(unauthorized());
    }
    let booking = lookup(&state, &id).await?;
    Ok(Json(booking))
}

#[derive(Deserialize, Default)]
struct UpdateBody {
    status: Option<String>,
    internal_notes: Option<String>,
}

/// PATCH /api/requests/:id - Update status and/or internal notes
async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Booking>, ApiError> {
    if !check_admin(&state, &headers, query.secret.as_deref()) {
        return Err(unauthorized());
    }
    let id = parse_id(&id).ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, NOT_FOUND))?;

    // A malformed body is treated as having no fields, same as an empty patch.
    let body: UpdateBody = serde_json::from_str(&body).unwrap_or_default();

    let status = body
        .status
        .as_deref()
        .and_then(crate::model::RequestStatus::parse);
    // Empty string clears the notes.
    let notes = body
        .internal_notes
        .map(|s| if s.is_empty() { None } else { Some(s) });

    if let Some(Some(text)) = &notes
        && text.chars().count() > MAX_INTERNAL_NOTES_LEN
    {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Internal notes must be 5000 characters or less.",
        ));
    }

    if status.is_none() && notes.is_none() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "No valid updates."));
    }

    match state.engine.update_status_notes(id, status, notes).await {
        Ok(booking) => Ok(Json(booking)),
        Err(EngineError::NotFound(_)) => Err(ApiError::new(StatusCode::NOT_FOUND, NOT_FOUND)),
        Err(EngineError::SlotTaken) => {
            metrics::counter!(observability::SLOT_CONFLICTS_TOTAL).increment(1);
            Err(ApiError::new(
                StatusCode::CONFLICT,
                "Another active request already holds this date and time slot.",
            ))
        }
        Err(e) => {
            error!("update failed: {e}");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update request.",
            ))
        }
    }
}

/// DELETE /api/requests/:id - Remove a request, cancelling its Zoom meeting
async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    if !check_admin(&state, &headers, query.secret.as_deref()) {
        return Err(unauthorized());
    }
    let id = parse_id(&id).ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, NOT_FOUND))?;

    let removed = match state.engine.delete(id).await {
        Ok(removed) => removed,
        Err(EngineError::NotFound(_)) => {
            return Err(ApiError::new(StatusCode::NOT_FOUND, NOT_FOUND));
        }
        Err(e) => {
            error!("delete failed: {e}");
            return Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete request.",
            ));
        }
    };

    // The row is already gone; the meeting cancellation is best-effort.
    let meeting_id = removed
        .zoom_meeting_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    match meeting_id {
        Some(meeting_id) => match state.meetings.cancel_meeting(meeting_id).await {
            Ok(()) => {
                metrics::counter!(observability::ZOOM_MEETINGS_CANCELLED_TOTAL).increment(1);
                Ok(Json(json!({ "ok": true, "zoom_cancelled": true })))
            }
            Err(e) => {
                error!("zoom cancel failed for meeting {meeting_id}: {e}");
                Ok(Json(json!({ "ok": true, "zoom_cancelled": false })))
            }
        },
        None => Ok(Json(json!({ "ok": true }))),
    }
}

/// POST /api/requests/:id/create-zoom-meeting - Create the meeting, save the
/// link, and email it to the requester
async fn create_zoom_meeting(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    if !check_admin_header(&state, &headers) {
        return Err(unauthorized());
    }
    let id = parse_id(&id)
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "Invalid request ID."))?;

    let Some(row) = state.engine.get(id).await else {
        return Err(ApiError::new(StatusCode::NOT_FOUND, NOT_FOUND));
    };

    let (Some(date), Some(slot), true) = (
        row.appointment_date,
        row.appointment_time_slot.clone(),
        row.wants_appointment,
    ) else {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "This request does not have a date and time slot for an appointment.",
        ));
    };

    if row
        .zoom_link
        .as_deref()
        .is_some_and(|link| !link.trim().is_empty())
    {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "This request already has a Zoom link. Edit or clear it first.",
        ));
    }

    let meeting_request = MeetingRequest {
        topic: format!("Livable — {}", row.name),
        date,
        slot,
    };
    let meeting = state
        .meetings
        .create_meeting(&meeting_request)
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let link: String = meeting.join_url.chars().take(MAX_ZOOM_LINK_LEN).collect();
    let updated = match state
        .engine
        .link_meeting(id, link.clone(), meeting.meeting_id.clone())
        .await
    {
        Ok(updated) => updated,
        Err(e) => {
            error!("saving zoom link failed: {e}");
            // Don't leave an orphaned meeting on Zoom's side.
            if let Some(meeting_id) = &meeting.meeting_id
                && let Err(cancel_err) = state.meetings.cancel_meeting(meeting_id).await
            {
                error!("zoom cancel failed for meeting {meeting_id}: {cancel_err}");
            }
            return Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Zoom meeting was created but saving the link failed.",
            ));
        }
    };

    metrics::counter!(observability::ZOOM_MEETINGS_CREATED_TOTAL).increment(1);

    let reschedule_link = match state.engine.ensure_reschedule_token(id).await {
        Ok(token) => Some(state.reschedule_link(token)),
        Err(e) => {
            error!("issuing reschedule token failed: {e}");
            updated.reschedule_token.map(|t| state.reschedule_link(t))
        }
    };

    let email = ZoomLinkEmail {
        to: updated.email.clone(),
        name: updated.name.clone(),
        zoom_link: link.clone(),
        appointment_date: updated.appointment_date,
        appointment_time_slot: updated.appointment_time_slot.clone(),
        reschedule_link,
        meeting_id: meeting.meeting_id.clone(),
        passcode: meeting.passcode.clone(),
    };
    let mailer = state.mailer.clone();
    let notifier = state.notifier.clone();
    tokio::spawn(async move {
        mailer.send_zoom_link(email).await;
        notifier.zoom_link_created(&updated).await;
    });

    Ok(Json(json!({ "ok": true, "zoom_link": link })))
}

async fn lookup(state: &AppState, raw_id: &str) -> Result<Booking, ApiError> {
    let id = parse_id(raw_id).ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, NOT_FOUND))?;
    state
        .engine
        .get(id)
        .await
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, NOT_FOUND))
}

fn parse_id(raw: &str) -> Option<Ulid> {
    Ulid::from_string(raw.trim()).ok()
}
