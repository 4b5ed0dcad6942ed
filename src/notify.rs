//! Discord webhook notifications for the team channel.
//!
//! Like email, these are fire-and-forget: a webhook failure is logged and
//! never surfaces to the requester.

use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::model::{Booking, ContactMode, friendly_date, short_ref};
use crate::slots::slot_label;

const EMBED_COLOR: u32 = 0x378f79;
const MAX_FIELD_VALUE: usize = 1024;

const VALID_WEBHOOK_PREFIXES: [&str; 2] = [
    "https://discord.com/api/webhooks/",
    "https://discordapp.com/api/webhooks/",
];

#[derive(Clone)]
pub struct Notifier {
    http: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    /// Rejects URLs that are not Discord webhook endpoints so a
    /// misconfigured value cannot leak request details elsewhere.
    pub fn new(webhook_url: Option<String>) -> Self {
        let webhook_url = webhook_url.and_then(|raw| {
            let url = raw.trim().to_string();
            if url.is_empty() {
                return None;
            }
            if VALID_WEBHOOK_PREFIXES.iter().any(|p| url.starts_with(p)) {
                Some(url)
            } else {
                warn!("DISCORD_WEBHOOK_URL is not a Discord webhook endpoint; notifications disabled");
                None
            }
        });
        Self {
            http: reqwest::Client::new(),
            webhook_url,
        }
    }

    pub async fn new_request(&self, booking: &Booking) {
        let mut fields = vec![
            field("Name", &booking.name, true),
            field("Email", &booking.email, true),
            field("Category", &booking.category, true),
        ];
        if let Some(phone) = &booking.phone {
            fields.push(field("Phone", phone, true));
        }
        fields.push(field("Description", &booking.message, false));
        fields.push(field("Request ID", &format!("{}…", short_ref(booking.id)), false));
        fields.push(field("Follow-up", &follow_up_line(booking), false));

        self.post("**New help request**", "Livable — New request", fields)
            .await;
    }

    pub async fn appointment_changed(
        &self,
        booking: &Booking,
        previous: Option<(chrono::NaiveDate, &str)>,
    ) {
        let mut fields = vec![
            field("Name", &booking.name, true),
            field("Email", &booking.email, true),
            field("Request ID", &format!("{}…", short_ref(booking.id)), false),
        ];
        if let (Some(date), Some(slot)) = (booking.appointment_date, &booking.appointment_time_slot)
        {
            fields.push(field("New time", &format_when(date, slot), false));
        }
        if let Some((date, slot)) = previous {
            fields.push(field("Previous time", &format_when(date, slot), false));
        }

        self.post(
            "**Appointment changed**",
            "Livable — Appointment changed",
            fields,
        )
        .await;
    }

    pub async fn zoom_link_created(&self, booking: &Booking) {
        let mut fields = vec![
            field("Name", &booking.name, true),
            field("Email", &booking.email, true),
            field("Request ID", &format!("{}…", short_ref(booking.id)), false),
        ];
        if let Some(link) = &booking.zoom_link {
            fields.push(field("Zoom link", link, false));
        }

        self.post("**Zoom link created**", "Livable — Zoom link created", fields)
            .await;
    }

    async fn post(&self, content: &str, title: &str, fields: Vec<Value>) {
        let Some(url) = &self.webhook_url else {
            warn!("DISCORD_WEBHOOK_URL not set; skipping notification");
            return;
        };

        let payload = json!({
            "content": content,
            "embeds": [{
                "title": title,
                "color": EMBED_COLOR,
                "fields": fields,
                "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            }],
        });

        match self.http.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!("discord webhook failed: {status} {body}");
            }
            Err(e) => error!("discord webhook error: {e}"),
        }
    }
}

fn field(name: &str, value: &str, inline: bool) -> Value {
    json!({ "name": name, "value": truncate_field(value, MAX_FIELD_VALUE), "inline": inline })
}

/// One-line summary of how the requester wants to be reached.
fn follow_up_line(booking: &Booking) -> String {
    match booking.preferred_contact {
        ContactMode::Zoom if booking.wants_appointment => {
            let mut parts = vec!["Zoom".to_string()];
            if let (Some(date), Some(slot)) =
                (booking.appointment_date, &booking.appointment_time_slot)
            {
                parts.push(format!("**{}**, {}", friendly_date(date), slot_label(slot)));
            }
            if let Some(preference) = &booking.appointment_preference {
                parts.push(format!("Note: {preference}"));
            }
            parts.join(" · ")
        }
        ContactMode::Zoom | ContactMode::Email => "Email".to_string(),
        ContactMode::Instagram => match &booking.instagram_handle {
            Some(handle) => format!("Instagram (@{})", handle.trim_start_matches('@')),
            None => "Instagram DM".to_string(),
        },
    }
}

fn format_when(date: chrono::NaiveDate, slot: &str) -> String {
    format!("**{}**, {}", friendly_date(date), slot_label(slot))
}

fn truncate_field(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max - 3).collect();
    out.push_str("...");
    out
}
