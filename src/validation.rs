//! Submission parsing and validation. Errors are user-facing messages,
//! surfaced verbatim in 400 responses.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::limits::*;
use crate::model::{ContactMode, NewRequest};
use crate::slots;

pub const INVALID_BODY: &str = "Invalid request body.";

/// Raw submit payload before validation. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub language: Option<String>,
    pub category: Option<String>,
    pub message: Option<String>,
    pub preferred_contact: Option<String>,
    pub appointment_preference: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time_slot: Option<String>,
    pub instagram_handle: Option<String>,
}

/// Matches the shape `local@host.tld`: no whitespace, exactly one `@` with
/// something before it, and at least one dot after it with a character on
/// both sides.
pub fn is_valid_email(s: &str) -> bool {
    if s.is_empty() || s.chars().count() > MAX_EMAIL_LEN {
        return false;
    }
    if s.chars().any(|c| c.is_whitespace()) {
        return false;
    }
    let Some((local, rest)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || rest.contains('@') {
        return false;
    }
    rest.bytes()
        .enumerate()
        .any(|(i, b)| b == b'.' && i > 0 && i + 1 < rest.len())
}

/// Strict `YYYY-MM-DD`: zero-padded shape plus a real calendar date.
pub fn parse_date_only(s: &str) -> Option<NaiveDate> {
    let b = s.as_bytes();
    if b.len() != 10 || b[4] != b'-' || b[7] != b'-' {
        return None;
    }
    let digits = b
        .iter()
        .enumerate()
        .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit());
    if !digits {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_string)
}

fn count(s: &str) -> usize {
    s.chars().count()
}

/// Validate a raw submit body into a `NewRequest`.
///
/// Mirrors the public form's rules: name, email, language, category, and
/// message are required; the contact mode defaults to zoom; date, slot, and
/// preference only apply to zoom requests and the handle only to instagram.
/// Oversized fields are rejected outright rather than truncated.
pub fn parse_submission(body: SubmitBody, today: NaiveDate) -> Result<NewRequest, &'static str> {
    let name = non_blank(body.name.as_ref()).ok_or(INVALID_BODY)?;
    let email = non_blank(body.email.as_ref()).ok_or(INVALID_BODY)?.to_lowercase();
    let language = non_blank(body.language.as_ref()).ok_or(INVALID_BODY)?;
    let category = non_blank(body.category.as_ref()).ok_or(INVALID_BODY)?;
    let message = non_blank(body.message.as_ref()).ok_or(INVALID_BODY)?;
    let phone = non_blank(body.phone.as_ref());

    let preferred_contact = body
        .preferred_contact
        .as_deref()
        .and_then(ContactMode::parse)
        .unwrap_or(ContactMode::Zoom);
    let wants_appointment = preferred_contact == ContactMode::Zoom;

    let appointment_preference = if wants_appointment {
        non_blank(body.appointment_preference.as_ref())
    } else {
        None
    };
    // Dates arrive as date-only strings but tolerate a trailing time part.
    let appointment_date = if wants_appointment {
        non_blank(body.appointment_date.as_ref()).map(|s| s.chars().take(10).collect::<String>())
    } else {
        None
    };
    let appointment_time_slot = if wants_appointment {
        non_blank(body.appointment_time_slot.as_ref())
    } else {
        None
    };
    let instagram_handle = if preferred_contact == ContactMode::Instagram {
        non_blank(body.instagram_handle.as_ref())
    } else {
        None
    };

    if count(&name) > MAX_NAME_LEN {
        return Err("Name must be 200 characters or less.");
    }
    if !is_valid_email(&email) {
        return Err("Please enter a valid email address.");
    }
    if let Some(ref p) = phone
        && count(p) > MAX_PHONE_LEN
    {
        return Err("Phone must be 50 characters or less.");
    }
    if count(&language) > MAX_LANGUAGE_LEN {
        return Err("Language must be 50 characters or less.");
    }
    if count(&category) > MAX_CATEGORY_LEN {
        return Err("Category must be 100 characters or less.");
    }
    if count(&message) > MAX_MESSAGE_LEN {
        return Err("Message must be 10000 characters or less.");
    }
    if let Some(ref p) = appointment_preference
        && count(p) > MAX_APPOINTMENT_PREFERENCE_LEN
    {
        return Err("Preferred time must be 500 characters or less.");
    }
    if let Some(ref h) = instagram_handle
        && count(h) > MAX_INSTAGRAM_HANDLE_LEN
    {
        return Err("Instagram handle must be 100 characters or less.");
    }

    let parsed_date = if wants_appointment {
        let Some(ref raw) = appointment_date else {
            return Err("Please select a date for your appointment.");
        };
        let Some(date) = parse_date_only(raw) else {
            return Err("Please enter a valid appointment date.");
        };
        if date < today {
            return Err("Appointment date must be today or a future date.");
        }
        let Some(ref slot) = appointment_time_slot else {
            return Err("Please select a time slot for your appointment.");
        };
        if !slots::is_valid_slot(slot) {
            return Err("Please select a valid time slot.");
        }
        Some(date)
    } else {
        None
    };

    Ok(NewRequest {
        name,
        email,
        phone,
        language,
        category,
        message,
        preferred_contact,
        wants_appointment,
        appointment_preference,
        appointment_date: parsed_date,
        appointment_time_slot: if wants_appointment {
            appointment_time_slot
        } else {
            None
        },
        instagram_handle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn zoom_body() -> SubmitBody {
        SubmitBody {
            name: Some("Mina Park".into()),
            email: Some("Mina@Example.com".into()),
            language: Some("Korean".into()),
            category: Some("Housing".into()),
            message: Some("Lease question".into()),
            preferred_contact: Some("zoom".into()),
            appointment_date: Some("2026-03-10".into()),
            appointment_time_slot: Some("09:00-10:00".into()),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_zoom_submission() {
        let req = parse_submission(zoom_body(), today()).unwrap();
        assert!(req.wants_appointment);
        assert_eq!(req.email, "mina@example.com"); // lowercased
        assert_eq!(req.appointment_date, NaiveDate::from_ymd_opt(2026, 3, 10));
        assert_eq!(req.appointment_time_slot.as_deref(), Some("09:00-10:00"));
    }

    #[test]
    fn missing_required_field_rejects_body() {
        for field in ["name", "email", "language", "category", "message"] {
            let mut body = zoom_body();
            match field {
                "name" => body.name = None,
                "email" => body.email = Some("   ".into()),
                "language" => body.language = None,
                "category" => body.category = Some("".into()),
                _ => body.message = None,
            }
            assert_eq!(parse_submission(body, today()).unwrap_err(), INVALID_BODY);
        }
    }

    #[test]
    fn unknown_contact_defaults_to_zoom() {
        let mut body = zoom_body();
        body.preferred_contact = Some("carrier-pigeon".into());
        let req = parse_submission(body, today()).unwrap();
        assert_eq!(req.preferred_contact, ContactMode::Zoom);
        assert!(req.wants_appointment);
    }

    #[test]
    fn email_contact_drops_appointment_fields() {
        let mut body = zoom_body();
        body.preferred_contact = Some("email".into());
        body.appointment_preference = Some("mornings".into());
        let req = parse_submission(body, today()).unwrap();
        assert!(!req.wants_appointment);
        assert!(req.appointment_date.is_none());
        assert!(req.appointment_time_slot.is_none());
        assert!(req.appointment_preference.is_none());
    }

    #[test]
    fn instagram_handle_only_kept_for_instagram() {
        let mut body = zoom_body();
        body.instagram_handle = Some("@mina".into());
        let req = parse_submission(body, today()).unwrap();
        assert!(req.instagram_handle.is_none());

        let mut body = zoom_body();
        body.preferred_contact = Some("instagram".into());
        body.instagram_handle = Some("@mina".into());
        let req = parse_submission(body, today()).unwrap();
        assert_eq!(req.instagram_handle.as_deref(), Some("@mina"));
        assert!(!req.wants_appointment);
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user.name+tag@sub.example.co.kr"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("plainaddress"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user@example."));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("user name@example.com"));
    }

    #[test]
    fn oversized_fields_get_field_message() {
        let mut body = zoom_body();
        body.name = Some("x".repeat(201));
        assert_eq!(
            parse_submission(body, today()).unwrap_err(),
            "Name must be 200 characters or less."
        );

        let mut body = zoom_body();
        body.message = Some("x".repeat(10_001));
        assert_eq!(
            parse_submission(body, today()).unwrap_err(),
            "Message must be 10000 characters or less."
        );

        let mut body = zoom_body();
        body.phone = Some("1".repeat(51));
        assert_eq!(
            parse_submission(body, today()).unwrap_err(),
            "Phone must be 50 characters or less."
        );
    }

    #[test]
    fn date_validation_messages() {
        let mut body = zoom_body();
        body.appointment_date = None;
        assert_eq!(
            parse_submission(body, today()).unwrap_err(),
            "Please select a date for your appointment."
        );

        let mut body = zoom_body();
        body.appointment_date = Some("2026-02-30".into());
        assert_eq!(
            parse_submission(body, today()).unwrap_err(),
            "Please enter a valid appointment date."
        );

        let mut body = zoom_body();
        body.appointment_date = Some("2026-3-1".into());
        assert_eq!(
            parse_submission(body, today()).unwrap_err(),
            "Please enter a valid appointment date."
        );

        let mut body = zoom_body();
        body.appointment_date = Some("2026-02-28".into());
        assert_eq!(
            parse_submission(body, today()).unwrap_err(),
            "Appointment date must be today or a future date."
        );
    }

    #[test]
    fn date_tolerates_trailing_time_part() {
        let mut body = zoom_body();
        body.appointment_date = Some("2026-03-10T09:00:00".into());
        let req = parse_submission(body, today()).unwrap();
        assert_eq!(req.appointment_date, NaiveDate::from_ymd_opt(2026, 3, 10));
    }

    #[test]
    fn today_is_accepted() {
        let mut body = zoom_body();
        body.appointment_date = Some("2026-03-01".into());
        assert!(parse_submission(body, today()).is_ok());
    }

    #[test]
    fn slot_validation_messages() {
        let mut body = zoom_body();
        body.appointment_time_slot = None;
        assert_eq!(
            parse_submission(body, today()).unwrap_err(),
            "Please select a time slot for your appointment."
        );

        let mut body = zoom_body();
        body.appointment_time_slot = Some("12:00-13:00".into());
        assert_eq!(
            parse_submission(body, today()).unwrap_err(),
            "Please select a valid time slot."
        );
    }

    #[test]
    fn parse_date_only_shapes() {
        assert_eq!(parse_date_only("2026-03-10"), NaiveDate::from_ymd_opt(2026, 3, 10));
        assert!(parse_date_only("2026-13-01").is_none());
        assert!(parse_date_only("26-03-10").is_none());
        assert!(parse_date_only("2026/03/10").is_none());
        assert!(parse_date_only("2026-03-10 ").is_none());
        assert!(parse_date_only("").is_none());
    }
}
