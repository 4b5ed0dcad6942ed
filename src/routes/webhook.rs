//! Inbound webhook: a request row was deleted by an external tool.
//!
//! Whatever deleted the row cannot cancel its Zoom meeting, so it posts the
//! removed row here and we cancel the meeting if one was scheduled.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::post,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use crate::observability;
use crate::routes::{ApiError, unauthorized};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/webhooks/request-deleted", post(request_deleted))
}

#[derive(Deserialize)]
struct SecretQuery {
    secret: Option<String>,
}

#[derive(Deserialize, Default)]
struct WebhookBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    table: Option<String>,
    schema: Option<String>,
    old_record: Option<OldRecord>,
}

#[derive(Deserialize, Default)]
struct OldRecord {
    zoom_meeting_id: Option<String>,
}

/// POST /api/webhooks/request-deleted - Cancel the Zoom meeting of a
/// request that was deleted out-of-band
async fn request_deleted(
    State(state): State<AppState>,
    Query(query): Query<SecretQuery>,
    headers: HeaderMap,
    body: String,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    // Secret is optional; when configured, every caller must present it.
    if let Some(expected) = &state.webhook_secret {
        let provided = headers
            .get("x-webhook-secret")
            .and_then(|v| v.to_str().ok())
            .or_else(|| {
                headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(strip_bearer)
            })
            .or(query.secret.as_deref());
        if provided != Some(expected.as_str()) {
            return Err(unauthorized());
        }
    }

    let body: WebhookBody = serde_json::from_str(&body)
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "Invalid JSON"))?;

    if body.kind.as_deref() != Some("DELETE")
        || body.table.as_deref() != Some("requests")
        || body.schema.as_deref() != Some("public")
    {
        return Ok((StatusCode::OK, Json(json!({ "ok": true, "message": "Ignored" }))));
    }

    let meeting_id = body
        .old_record
        .and_then(|r| r.zoom_meeting_id)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let Some(meeting_id) = meeting_id else {
        return Ok((
            StatusCode::OK,
            Json(json!({ "ok": true, "message": "No Zoom meeting to cancel" })),
        ));
    };

    if let Err(e) = state.meetings.cancel_meeting(&meeting_id).await {
        error!("zoom cancel failed for meeting {meeting_id}: {e}");
        return Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "ok": false, "error": "Zoom meeting could not be cancelled" })),
        ));
    }

    metrics::counter!(observability::ZOOM_MEETINGS_CANCELLED_TOTAL).increment(1);
    Ok((
        StatusCode::OK,
        Json(json!({ "ok": true, "message": "Zoom meeting cancelled" })),
    ))
}

/// `Authorization: Bearer <secret>` support; any other shape is taken as the
/// raw secret.
fn strip_bearer(value: &str) -> &str {
    match value.get(..7) {
        Some(prefix)
            if prefix[..6].eq_ignore_ascii_case("bearer")
                && prefix.as_bytes()[6].is_ascii_whitespace() =>
        {
            value[7..].trim_start()
        }
        _ => value,
    }
}
