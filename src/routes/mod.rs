pub mod admin;
pub mod reschedule;
pub mod slots;
pub mod submit;
pub mod webhook;

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// An error with the HTTP status and user-facing message already decided.
pub struct ApiError {
    status: StatusCode,
    message: String,
    retry_after: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after = Some(secs);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        let mut response = (self.status, body).into_response();
        if let Some(secs) = self.retry_after
            && let Ok(value) = secs.to_string().parse()
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

pub fn unauthorized() -> ApiError {
    ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized")
}

/// Admin check for collection routes: `x-admin-secret` header only.
/// Always fails when `ADMIN_SECRET` is not configured.
pub fn check_admin_header(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(expected) = &state.admin_secret else {
        return false;
    };
    headers
        .get("x-admin-secret")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|secret| secret == expected)
}

/// Admin check for single-request routes: header, or `?secret=` so the
/// dashboard can link directly to a request.
pub fn check_admin(state: &AppState, headers: &HeaderMap, query_secret: Option<&str>) -> bool {
    let Some(expected) = &state.admin_secret else {
        return false;
    };
    let provided = headers
        .get("x-admin-secret")
        .and_then(|v| v.to_str().ok())
        .or(query_secret);
    provided.is_some_and(|secret| secret == expected)
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(submit::router())
        .merge(slots::router())
        .merge(reschedule::router())
        .merge(admin::router())
        .merge(webhook::router())
        .with_state(state)
        .layer(cors)
}
