//! Zoom meeting provider (Server-to-Server OAuth). An access token is
//! fetched per operation; S2S tokens are cheap and short-lived.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::error;
use url::Url;

use crate::config::ZoomConfig;
use crate::slots;

const TOKEN_URL: &str = "https://zoom.us/oauth/token";
const API_BASE: &str = "https://api.zoom.us/v2/";

#[derive(Debug)]
pub enum ZoomError {
    /// Credentials absent from the environment; lists the missing names.
    Config { missing: Vec<&'static str> },
    TokenRefused,
    MissingAccessToken,
    CreateRefused,
    MissingJoinUrl,
    MissingMeetingId,
    CancelRefused(u16),
    Http(String),
}

impl std::fmt::Display for ZoomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoomError::Config { missing } => write!(
                f,
                "Zoom credentials not configured. Missing in env: {}.",
                missing.join(", ")
            ),
            ZoomError::TokenRefused => write!(f, "Failed to get Zoom access token."),
            ZoomError::MissingAccessToken => write!(f, "No access_token in Zoom response."),
            ZoomError::CreateRefused => write!(f, "Zoom could not create the meeting."),
            ZoomError::MissingJoinUrl => write!(f, "Zoom did not return a join URL."),
            ZoomError::MissingMeetingId => write!(f, "Missing meeting ID"),
            ZoomError::CancelRefused(status) => write!(f, "Zoom returned {status}"),
            ZoomError::Http(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ZoomError {}

impl From<reqwest::Error> for ZoomError {
    fn from(e: reqwest::Error) -> Self {
        ZoomError::Http(e.to_string())
    }
}

/// What the admin flow needs from a provider to schedule a call.
#[derive(Debug, Clone)]
pub struct MeetingRequest {
    pub topic: String,
    pub date: NaiveDate,
    pub slot: String,
}

#[derive(Debug, Clone)]
pub struct Meeting {
    /// Join URL with the passcode embedded when one exists.
    pub join_url: String,
    pub meeting_id: Option<String>,
    /// Plain passcode, for display alongside the link.
    pub passcode: Option<String>,
}

/// Seam between the admin routes and Zoom, so tests can swap in a fake.
#[async_trait]
pub trait MeetingService: Send + Sync {
    async fn create_meeting(&self, req: &MeetingRequest) -> Result<Meeting, ZoomError>;
    async fn cancel_meeting(&self, meeting_id: &str) -> Result<(), ZoomError>;
}

pub struct ZoomClient {
    http: reqwest::Client,
    config: ZoomConfig,
}

impl ZoomClient {
    pub fn new(config: ZoomConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn credentials(&self) -> Result<(&str, &str, &str), ZoomError> {
        let mut missing = Vec::new();
        let account_id = non_blank(self.config.account_id.as_deref());
        let client_id = non_blank(self.config.client_id.as_deref());
        let client_secret = non_blank(self.config.client_secret.as_deref());
        if account_id.is_none() {
            missing.push("ZOOM_ACCOUNT_ID");
        }
        if client_id.is_none() {
            missing.push("ZOOM_CLIENT_ID");
        }
        if client_secret.is_none() {
            missing.push("ZOOM_CLIENT_SECRET");
        }
        if !missing.is_empty() {
            return Err(ZoomError::Config { missing });
        }
        Ok((
            account_id.unwrap_or_default(),
            client_id.unwrap_or_default(),
            client_secret.unwrap_or_default(),
        ))
    }

    async fn fetch_access_token(&self) -> Result<String, ZoomError> {
        let (account_id, client_id, client_secret) = self.credentials()?;
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "account_credentials"),
                ("account_id", account_id),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!("zoom token error: {status} {body}");
            return Err(ZoomError::TokenRefused);
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: Option<String>,
        }
        let token: TokenResponse = response.json().await?;
        token.access_token.ok_or(ZoomError::MissingAccessToken)
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url, ZoomError> {
        let mut url = Url::parse(API_BASE).map_err(|e| ZoomError::Http(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ZoomError::Http("cannot build Zoom API URL".into()))?
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl MeetingService for ZoomClient {
    async fn create_meeting(&self, req: &MeetingRequest) -> Result<Meeting, ZoomError> {
        let access_token = self.fetch_access_token().await?;
        let timing = slots::slot_timing(&req.slot);
        let start_time = format!("{}T{}:00", req.date, timing.start.format("%H:%M"));

        let url = self.api_url(&["users", self.config.user_id.as_str(), "meetings"])?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&access_token)
            .json(&serde_json::json!({
                "topic": req.topic,
                "type": 2,
                "start_time": start_time,
                "duration": timing.duration_minutes,
                "timezone": self.config.timezone,
                "settings": {
                    "join_before_host": true,
                    "waiting_room": false,
                },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!("zoom create meeting error: {status} {body}");
            return Err(ZoomError::CreateRefused);
        }

        #[derive(Deserialize)]
        struct MeetingResponse {
            join_url: Option<String>,
            id: Option<i64>,
            password: Option<String>,
            encrypted_password: Option<String>,
        }
        let data: MeetingResponse = response.json().await?;
        let join_url = data.join_url.ok_or(ZoomError::MissingJoinUrl)?;

        // Prefer the encrypted form in the URL so joining is one click.
        let pwd_for_url = data
            .encrypted_password
            .as_deref()
            .or(data.password.as_deref());
        let join_url = ensure_joinable_url(&join_url, pwd_for_url);

        Ok(Meeting {
            join_url,
            meeting_id: data.id.map(|id| id.to_string()),
            passcode: data.password.filter(|p| !p.is_empty()),
        })
    }

    /// Idempotent: a 404 from Zoom means the meeting is already gone.
    async fn cancel_meeting(&self, meeting_id: &str) -> Result<(), ZoomError> {
        let trimmed = meeting_id.trim();
        if trimmed.is_empty() {
            return Err(ZoomError::MissingMeetingId);
        }
        let access_token = self.fetch_access_token().await?;
        let url = self.api_url(&["meetings", trimmed])?;
        let response = self
            .http
            .delete(url)
            .bearer_auth(&access_token)
            .send()
            .await?;

        match response.status().as_u16() {
            204 | 404 => Ok(()),
            status => {
                let body = response.text().await.unwrap_or_default();
                error!("zoom delete meeting error: {status} {body}");
                Err(ZoomError::CancelRefused(status))
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Append `pwd=` to a join URL that lacks it, so users are not prompted for
/// the passcode. URLs that already carry one are left alone.
pub fn ensure_joinable_url(join_url: &str, passcode: Option<&str>) -> String {
    let Some(pwd) = passcode.filter(|p| !p.is_empty()) else {
        return join_url.to_string();
    };
    if join_url.contains("pwd=") {
        return join_url.to_string();
    }
    let separator = if join_url.contains('?') { '&' } else { '?' };
    let encoded: String = url::form_urlencoded::byte_serialize(pwd.as_bytes()).collect();
    format!("{join_url}{separator}pwd={encoded}")
}
