//! Transactional email via the Brevo HTTP API.
//!
//! Every send is best-effort: failures are logged and swallowed so a mail
//! outage never fails the request that triggered it. Callers spawn these
//! futures off the request path.

use chrono::NaiveDate;
use tracing::{error, warn};

use crate::config::EmailConfig;
use crate::model::friendly_date;
use crate::slots::slot_label;

const BREVO_API_URL: &str = "https://api.brevo.com/v3/smtp/email";

/// Sends transactional mail through Brevo. When the config is absent
/// (no `BREVO_API_KEY` / `FROM_EMAIL`), sends become logged no-ops.
#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    config: Option<EmailConfig>,
}

/// Submission receipt sent to the requester.
pub struct ConfirmationEmail {
    pub to: String,
    pub name: String,
    pub request_ref: String,
    pub submitted_on: String,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time_slot: Option<String>,
    pub appointment_preference: Option<String>,
    pub instagram_handle: Option<String>,
    pub reschedule_link: Option<String>,
}

/// Meeting-link email sent after an admin creates the Zoom meeting.
pub struct ZoomLinkEmail {
    pub to: String,
    pub name: String,
    pub zoom_link: String,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time_slot: Option<String>,
    pub reschedule_link: Option<String>,
    pub meeting_id: Option<String>,
    pub passcode: Option<String>,
}

/// Confirmation sent after a self-service reschedule.
pub struct AppointmentChangedEmail {
    pub to: String,
    pub name: String,
    pub appointment_date: NaiveDate,
    pub appointment_time_slot: String,
}

impl Mailer {
    pub fn new(config: Option<EmailConfig>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub async fn send_confirmation(&self, email: ConfirmationEmail) {
        let subject = format!("Livable — We received your request ({})", email.request_ref);
        let html = confirmation_html(&email);
        self.send(&email.to, &email.name, &subject, html).await;
    }

    pub async fn send_zoom_link(&self, email: ZoomLinkEmail) {
        let html = zoom_link_html(&email);
        self.send(&email.to, &email.name, "Livable — Your Zoom meeting link", html)
            .await;
    }

    pub async fn send_appointment_changed(&self, email: AppointmentChangedEmail) {
        let html = appointment_changed_html(&email);
        self.send(
            &email.to,
            &email.name,
            "Livable — Your appointment has been changed",
            html,
        )
        .await;
    }

    async fn send(&self, to: &str, to_name: &str, subject: &str, html: String) {
        let Some(config) = &self.config else {
            warn!("email not sent: BREVO_API_KEY and FROM_EMAIL are not configured");
            return;
        };

        let result = self
            .http
            .post(BREVO_API_URL)
            .header("accept", "application/json")
            .header("api-key", &config.api_key)
            .json(&serde_json::json!({
                "sender": { "name": config.from_name, "email": config.from_email },
                "to": [{ "email": to, "name": to_name }],
                "replyTo": { "email": config.reply_to },
                "subject": subject,
                "htmlContent": html,
            }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!("brevo api error: {status} {body}");
            }
            Err(e) => error!("brevo send error: {e}"),
        }
    }
}

// ── Templates ───────────────────────────────────────────────────────────────

fn confirmation_html(email: &ConfirmationEmail) -> String {
    let mut html = String::new();
    push_line(&mut html, format!("<p>Hi {},</p>", escape_html(&email.name)));
    push_line(
        &mut html,
        "<p>We've received your request and will get back to you with next steps.</p>".to_string(),
    );
    push_line(
        &mut html,
        format!(
            "<p><strong>Request reference:</strong> {}…</p>",
            email.request_ref
        ),
    );
    push_line(
        &mut html,
        format!("<p><strong>Submitted:</strong> {}</p>", email.submitted_on),
    );
    if let (Some(date), Some(slot)) = (email.appointment_date, &email.appointment_time_slot) {
        push_line(
            &mut html,
            format!(
                "<p><strong>Appointment:</strong> {}, {}</p>",
                friendly_date(date),
                slot_label(slot)
            ),
        );
    }
    if let Some(preference) = &email.appointment_preference {
        push_line(
            &mut html,
            format!(
                "<p><strong>Preferred time:</strong> {}</p>",
                escape_html(preference)
            ),
        );
    }
    if let Some(handle) = &email.instagram_handle {
        push_line(
            &mut html,
            format!(
                "<p><strong>Instagram:</strong> @{}</p>",
                escape_html(handle.trim_start_matches('@'))
            ),
        );
    }
    if let Some(link) = &email.reschedule_link {
        push_line(
            &mut html,
            format!(
                "<p>Need a different time? <a href=\"{}\">Change your appointment</a>.</p>",
                escape_html(link)
            ),
        );
    }
    push_line(
        &mut html,
        "<p>If you have any urgent follow-up, you can reply to this email.</p>".to_string(),
    );
    push_line(&mut html, "<p>— Livable</p>".to_string());
    html
}

fn zoom_link_html(email: &ZoomLinkEmail) -> String {
    let mut html = String::new();
    push_line(&mut html, format!("<p>Hi {},</p>", escape_html(&email.name)));
    push_line(&mut html, "<p>Your Zoom meeting is ready.</p>".to_string());
    if let (Some(date), Some(slot)) = (email.appointment_date, &email.appointment_time_slot) {
        push_line(
            &mut html,
            format!(
                "<p><strong>When:</strong> {}, {}</p>",
                friendly_date(date),
                slot_label(slot)
            ),
        );
    }
    push_line(
        &mut html,
        format!(
            "<p><strong>Join link:</strong> <a href=\"{0}\">{0}</a></p>",
            escape_html(&email.zoom_link)
        ),
    );
    if let Some(passcode) = &email.passcode {
        push_line(
            &mut html,
            format!("<p><strong>Passcode:</strong> {}</p>", escape_html(passcode)),
        );
    }
    if let Some(meeting_id) = &email.meeting_id {
        push_line(
            &mut html,
            format!(
                "<p><strong>Meeting ID:</strong> {}</p>",
                escape_html(meeting_id)
            ),
        );
    }
    if let Some(link) = &email.reschedule_link {
        push_line(
            &mut html,
            format!(
                "<p>Need a different time? <a href=\"{}\">Change your appointment</a>.</p>",
                escape_html(link)
            ),
        );
    }
    push_line(
        &mut html,
        "<p>If you have any urgent follow-up, you can reply to this email.</p>".to_string(),
    );
    push_line(&mut html, "<p>— Livable</p>".to_string());
    html
}

fn appointment_changed_html(email: &AppointmentChangedEmail) -> String {
    let mut html = String::new();
    push_line(&mut html, format!("<p>Hi {},</p>", escape_html(&email.name)));
    push_line(
        &mut html,
        "<p>Your appointment has been changed.</p>".to_string(),
    );
    push_line(
        &mut html,
        format!(
            "<p><strong>New time:</strong> {}, {}</p>",
            friendly_date(email.appointment_date),
            slot_label(&email.appointment_time_slot)
        ),
    );
    push_line(
        &mut html,
        "<p>Any earlier Zoom link no longer applies. We will send a new one if needed.</p>"
            .to_string(),
    );
    push_line(
        &mut html,
        "<p>If you have any urgent follow-up, you can reply to this email.</p>".to_string(),
    );
    push_line(&mut html, "<p>— Livable</p>".to_string());
    html
}

fn push_line(html: &mut String, line: String) {
    html.push_str("  ");
    html.push_str(&line);
    html.push('\n');
}

/// Escapes user-supplied text for interpolation into email HTML.
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<b>&"x"</b>"#),
            "&lt;b&gt;&amp;&quot;x&quot;&lt;/b&gt;"
        );
        assert_eq!(escape_html("plain text"), "plain text");
    }

    #[test]
    fn confirmation_includes_base_lines() {
        let html = confirmation_html(&ConfirmationEmail {
            to: "sun@example.com".into(),
            name: "Sun Kim".into(),
            request_ref: "01J8ZKQ3".into(),
            submitted_on: "Mar 10, 2026".into(),
            appointment_date: None,
            appointment_time_slot: None,
            appointment_preference: None,
            instagram_handle: None,
            reschedule_link: None,
        });
        assert!(html.contains("<p>Hi Sun Kim,</p>"));
        assert!(html.contains(
            "<p>We've received your request and will get back to you with next steps.</p>"
        ));
        assert!(html.contains("<p><strong>Request reference:</strong> 01J8ZKQ3…</p>"));
        assert!(html.contains("<p><strong>Submitted:</strong> Mar 10, 2026</p>"));
        assert!(html.contains("<p>— Livable</p>"));
        assert!(!html.contains("Appointment:"));
        assert!(!html.contains("Change your appointment"));
    }

    #[test]
    fn confirmation_appointment_block_uses_friendly_labels() {
        let html = confirmation_html(&ConfirmationEmail {
            to: "sun@example.com".into(),
            name: "Sun".into(),
            request_ref: "01J8ZKQ3".into(),
            submitted_on: "Mar 10, 2026".into(),
            appointment_date: Some(d("2026-03-16")),
            appointment_time_slot: Some("14:00-15:00".into()),
            appointment_preference: Some("after lunch".into()),
            instagram_handle: None,
            reschedule_link: Some("https://livable.example/reschedule?token=01J8ZKQ3".into()),
        });
        assert!(html.contains("<p><strong>Appointment:</strong> Mon, Mar 16, 2026, 2:00 PM – 3:00 PM</p>"));
        assert!(html.contains("<p><strong>Preferred time:</strong> after lunch</p>"));
        assert!(html.contains("href=\"https://livable.example/reschedule?token=01J8ZKQ3\""));
    }

    #[test]
    fn confirmation_escapes_user_fields() {
        let html = confirmation_html(&ConfirmationEmail {
            to: "x@example.com".into(),
            name: "<script>".into(),
            request_ref: "01J8ZKQ3".into(),
            submitted_on: "Mar 10, 2026".into(),
            appointment_date: None,
            appointment_time_slot: None,
            appointment_preference: Some("9am & 10am".into()),
            instagram_handle: Some("@a<b".into()),
            reschedule_link: None,
        });
        assert!(html.contains("<p>Hi &lt;script&gt;,</p>"));
        assert!(html.contains("9am &amp; 10am"));
        assert!(html.contains("@a&lt;b"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn zoom_link_email_lists_join_details() {
        let html = zoom_link_html(&ZoomLinkEmail {
            to: "sun@example.com".into(),
            name: "Sun".into(),
            zoom_link: "https://zoom.us/j/123?pwd=abc".into(),
            appointment_date: Some(d("2026-03-16")),
            appointment_time_slot: Some("09:00-10:00".into()),
            reschedule_link: Some("https://livable.example/reschedule?token=t".into()),
            meeting_id: Some("123456".into()),
            passcode: Some("abc".into()),
        });
        assert!(html.contains("<p><strong>When:</strong> Mon, Mar 16, 2026, 9:00 AM – 10:00 AM</p>"));
        assert!(html.contains("<a href=\"https://zoom.us/j/123?pwd=abc\">https://zoom.us/j/123?pwd=abc</a>"));
        assert!(html.contains("<p><strong>Passcode:</strong> abc</p>"));
        assert!(html.contains("<p><strong>Meeting ID:</strong> 123456</p>"));
        assert!(html.contains("href=\"https://livable.example/reschedule?token=t\""));
    }

    #[test]
    fn appointment_changed_email_names_the_new_time() {
        let html = appointment_changed_html(&AppointmentChangedEmail {
            to: "sun@example.com".into(),
            name: "Sun".into(),
            appointment_date: d("2026-03-17"),
            appointment_time_slot: "16:00-17:00".into(),
        });
        assert!(html.contains("<p>Your appointment has been changed.</p>"));
        assert!(html.contains("<p><strong>New time:</strong> Tue, Mar 17, 2026, 4:00 PM – 5:00 PM</p>"));
    }
}
