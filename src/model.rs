use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Request lifecycle status. Only active requests (`new`, `in_progress`)
/// hold their appointment slot; resolving or closing releases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    New,
    InProgress,
    Resolved,
    Closed,
}

impl RequestStatus {
    pub fn is_active(self) -> bool {
        matches!(self, RequestStatus::New | RequestStatus::InProgress)
    }

    /// Parse the stored form. Unknown values are rejected, never coerced.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "in_progress" => Some(Self::InProgress),
            "resolved" => Some(Self::Resolved),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }
}

/// How the requester wants to be contacted. Zoom implies an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactMode {
    Zoom,
    Email,
    Instagram,
}

impl ContactMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "zoom" => Some(Self::Zoom),
            "email" => Some(Self::Email),
            "instagram" => Some(Self::Instagram),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zoom => "zoom",
            Self::Email => "email",
            Self::Instagram => "instagram",
        }
    }
}

/// A stored help request. Serialized field names are the public API shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: RequestStatus,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub language: String,
    pub category: String,
    pub message: String,
    pub internal_notes: Option<String>,
    pub preferred_contact: ContactMode,
    pub wants_appointment: bool,
    pub appointment_preference: Option<String>,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time_slot: Option<String>,
    pub zoom_link: Option<String>,
    pub zoom_meeting_id: Option<String>,
    pub instagram_handle: Option<String>,
    pub reschedule_token: Option<Ulid>,
}

impl Booking {
    /// Build a fresh row from a validated submission. The caller supplies the
    /// id and reschedule token so it can guarantee their uniqueness.
    pub fn from_submission(
        req: NewRequest,
        id: Ulid,
        reschedule_token: Option<Ulid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            created_at: now,
            updated_at: now,
            status: RequestStatus::New,
            name: req.name,
            email: req.email,
            phone: req.phone,
            language: req.language,
            category: req.category,
            message: req.message,
            internal_notes: None,
            preferred_contact: req.preferred_contact,
            wants_appointment: req.wants_appointment,
            appointment_preference: req.appointment_preference,
            appointment_date: req.appointment_date,
            appointment_time_slot: req.appointment_time_slot,
            zoom_link: None,
            zoom_meeting_id: None,
            instagram_handle: req.instagram_handle,
            reschedule_token,
        }
    }

    /// True when the row currently occupies an appointment slot.
    pub fn holds_slot(&self) -> bool {
        self.status.is_active()
            && self.wants_appointment
            && self.appointment_date.is_some()
            && self.appointment_time_slot.is_some()
    }
}

/// A validated submission, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub language: String,
    pub category: String,
    pub message: String,
    pub preferred_contact: ContactMode,
    pub wants_appointment: bool,
    pub appointment_preference: Option<String>,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time_slot: Option<String>,
    pub instagram_handle: Option<String>,
}

/// Durable log records. One variant per state change; replay applies them in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingEvent {
    /// Full row, also the snapshot form emitted by compaction.
    Submitted { booking: Booking },
    /// Appointment moved; clears any meeting link tied to the old time.
    ScheduleChanged {
        id: Ulid,
        date: NaiveDate,
        slot: String,
        at: DateTime<Utc>,
    },
    /// Admin status/notes edit. `notes` is double-optional: outer `None`
    /// leaves the notes untouched, inner `None` clears them.
    StatusNotesUpdated {
        id: Ulid,
        status: Option<RequestStatus>,
        notes: Option<Option<String>>,
        at: DateTime<Utc>,
    },
    MeetingLinked {
        id: Ulid,
        link: String,
        meeting_id: Option<String>,
        at: DateTime<Utc>,
    },
    TokenIssued {
        id: Ulid,
        token: Ulid,
        at: DateTime<Utc>,
    },
    Deleted { id: Ulid },
}

/// Short request reference shown to users (first 8 chars of the id).
pub fn short_ref(id: Ulid) -> String {
    id.to_string()[..8].to_string()
}

/// Date as shown in emails and admin notifications, e.g. "Tue, Mar 10, 2026".
pub fn friendly_date(date: NaiveDate) -> String {
    date.format("%a, %b %-d, %Y").to_string()
}
