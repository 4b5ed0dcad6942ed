//! Environment configuration, read once at startup.
//!
//! Server settings use the `LIVABLE_` prefix. Integration credentials keep
//! their provider names (`ZOOM_*`, `BREVO_API_KEY`, `DISCORD_WEBHOOK_URL`)
//! so they can be shared with other deployments of the same integrations.

/// Zoom Server-to-Server OAuth credentials.
///
/// The id/secret fields stay optional: the server runs without Zoom and the
/// client reports exactly which variables are missing when an admin tries to
/// create a meeting.
#[derive(Clone)]
pub struct ZoomConfig {
    pub account_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub user_id: String,
    pub timezone: String,
}

/// Brevo sender identity. Present only when both `BREVO_API_KEY` and
/// `FROM_EMAIL` are set.
#[derive(Clone)]
pub struct EmailConfig {
    pub api_key: String,
    pub from_email: String,
    pub from_name: String,
    pub reply_to: String,
}

pub struct AppConfig {
    pub bind: String,
    pub port: String,
    pub data_dir: String,
    pub metrics_port: Option<u16>,
    pub admin_secret: Option<String>,
    pub webhook_secret: Option<String>,
    pub app_url: String,
    pub zoom: ZoomConfig,
    pub email: Option<EmailConfig>,
    pub discord_webhook_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind = std::env::var("LIVABLE_BIND").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("LIVABLE_PORT").unwrap_or_else(|_| "8080".into());
        let data_dir = std::env::var("LIVABLE_DATA_DIR").unwrap_or_else(|_| "./data".into());
        let metrics_port: Option<u16> = std::env::var("LIVABLE_METRICS_PORT")
            .ok()
            .and_then(|s| s.parse().ok());

        // Reschedule links in outgoing email point at this origin.
        let app_url = std::env::var("APP_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        let zoom = ZoomConfig {
            account_id: non_empty(std::env::var("ZOOM_ACCOUNT_ID").ok()),
            client_id: non_empty(std::env::var("ZOOM_CLIENT_ID").ok()),
            client_secret: non_empty(std::env::var("ZOOM_CLIENT_SECRET").ok()),
            user_id: std::env::var("ZOOM_USER_ID").unwrap_or_else(|_| "me".into()),
            timezone: std::env::var("APP_TIMEZONE").unwrap_or_else(|_| "Asia/Seoul".into()),
        };

        let email = match (
            non_empty(std::env::var("BREVO_API_KEY").ok()),
            non_empty(std::env::var("FROM_EMAIL").ok()),
        ) {
            (Some(api_key), Some(from_email)) => {
                let reply_to = non_empty(std::env::var("REPLY_TO_EMAIL").ok())
                    .unwrap_or_else(|| from_email.clone());
                Some(EmailConfig {
                    api_key,
                    from_name: std::env::var("FROM_NAME").unwrap_or_else(|_| "Livable".into()),
                    reply_to,
                    from_email,
                })
            }
            _ => None,
        };

        Self {
            bind,
            port,
            data_dir,
            metrics_port,
            admin_secret: non_empty(std::env::var("ADMIN_SECRET").ok()),
            webhook_secret: non_empty(std::env::var("WEBHOOK_SECRET").ok()),
            app_url,
            zoom,
            email,
            discord_webhook_url: non_empty(std::env::var("DISCORD_WEBHOOK_URL").ok()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
