//! Shared application state handed to every route handler.

use std::sync::Arc;

use ulid::Ulid;

use crate::email::Mailer;
use crate::engine::Engine;
use crate::notify::Notifier;
use crate::rate_limit::RateLimiter;
use crate::zoom::MeetingService;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub meetings: Arc<dyn MeetingService>,
    pub mailer: Mailer,
    pub notifier: Notifier,
    pub limiter: Arc<RateLimiter>,
    pub admin_secret: Option<String>,
    pub webhook_secret: Option<String>,
    /// Public origin for links in outgoing email, no trailing slash.
    pub app_url: String,
}

impl AppState {
    pub fn reschedule_link(&self, token: Ulid) -> String {
        format!("{}/reschedule?token={token}", self.app_url)
    }
}
