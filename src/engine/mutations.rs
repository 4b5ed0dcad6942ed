use chrono::{NaiveDate, Utc};
use ulid::Ulid;

use crate::model::{Booking, BookingEvent, NewRequest, RequestStatus};

use super::{Engine, EngineError, conflict};

/// Outcome of a reschedule. `Unchanged` means the request was already booked
/// for the requested date and slot; nothing was written.
#[derive(Debug)]
pub enum Reschedule {
    Changed {
        booking: Booking,
        previous_date: Option<NaiveDate>,
        previous_slot: Option<String>,
    },
    Unchanged {
        booking: Booking,
    },
}

impl Engine {
    /// Store a validated submission. Claims the appointment slot (if any)
    /// and issues a reschedule token for appointment requests.
    pub async fn submit(&self, req: NewRequest) -> Result<Booking, EngineError> {
        let mut state = self.state.write().await;
        if req.wants_appointment
            && let (Some(date), Some(slot)) =
                (req.appointment_date, req.appointment_time_slot.as_deref())
        {
            conflict::check_slot_free(&state.slot_index, date, slot, None)?;
        }

        // Ulid collisions are practically impossible; regenerate anyway.
        let mut id = Ulid::new();
        while state.bookings.contains_key(&id) {
            id = Ulid::new();
        }
        let token = if req.wants_appointment {
            let mut t = Ulid::new();
            while state.by_token.contains_key(&t) {
                t = Ulid::new();
            }
            Some(t)
        } else {
            None
        };

        let booking = Booking::from_submission(req, id, token, Utc::now());
        let event = BookingEvent::Submitted {
            booking: booking.clone(),
        };
        self.persist_and_apply(&mut state, &event).await?;
        Ok(booking)
    }

    /// Move an appointment identified by its reschedule token. Re-requesting
    /// the current date and slot is a no-op, so a retried form submit never
    /// fails on its own claim.
    pub async fn reschedule(
        &self,
        token: Ulid,
        date: NaiveDate,
        slot: &str,
    ) -> Result<Reschedule, EngineError> {
        let mut state = self.state.write().await;
        let id = *state.by_token.get(&token).ok_or(EngineError::TokenNotFound)?;
        let row = state.bookings.get(&id).ok_or(EngineError::TokenNotFound)?;
        if !row.wants_appointment {
            return Err(EngineError::Validation(
                "This request does not have an appointment to change.",
            ));
        }
        if row.appointment_date == Some(date) && row.appointment_time_slot.as_deref() == Some(slot)
        {
            return Ok(Reschedule::Unchanged {
                booking: row.clone(),
            });
        }
        let previous_date = row.appointment_date;
        let previous_slot = row.appointment_time_slot.clone();
        conflict::check_slot_free(&state.slot_index, date, slot, Some(id))?;

        let event = BookingEvent::ScheduleChanged {
            id,
            date,
            slot: slot.to_string(),
            at: Utc::now(),
        };
        self.persist_and_apply(&mut state, &event).await?;
        let booking = state
            .bookings
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound(id))?;
        Ok(Reschedule::Changed {
            booking,
            previous_date,
            previous_slot,
        })
    }

    /// Admin edit of status and/or internal notes. `notes: Some(None)` clears
    /// the notes; `notes: None` leaves them alone.
    pub async fn update_status_notes(
        &self,
        id: Ulid,
        status: Option<RequestStatus>,
        notes: Option<Option<String>>,
    ) -> Result<Booking, EngineError> {
        let mut state = self.state.write().await;
        let row = state.bookings.get(&id).ok_or(EngineError::NotFound(id))?;

        // Reactivating a scheduled request re-claims its slot, which someone
        // else may have taken in the meantime.
        if let Some(new_status) = status
            && new_status.is_active()
            && !row.status.is_active()
            && row.wants_appointment
            && let (Some(date), Some(slot)) =
                (row.appointment_date, row.appointment_time_slot.as_deref())
        {
            conflict::check_slot_free(&state.slot_index, date, slot, Some(id))?;
        }

        let event = BookingEvent::StatusNotesUpdated {
            id,
            status,
            notes,
            at: Utc::now(),
        };
        self.persist_and_apply(&mut state, &event).await?;
        state
            .bookings
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound(id))
    }

    /// Attach a meeting link created by the meeting provider.
    pub async fn link_meeting(
        &self,
        id: Ulid,
        link: String,
        meeting_id: Option<String>,
    ) -> Result<Booking, EngineError> {
        let mut state = self.state.write().await;
        if !state.bookings.contains_key(&id) {
            return Err(EngineError::NotFound(id));
        }
        let event = BookingEvent::MeetingLinked {
            id,
            link,
            meeting_id,
            at: Utc::now(),
        };
        self.persist_and_apply(&mut state, &event).await?;
        state
            .bookings
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound(id))
    }

    /// Return the request's reschedule token, issuing one if it has none.
    /// Rows predating token issuance get theirs here.
    pub async fn ensure_reschedule_token(&self, id: Ulid) -> Result<Ulid, EngineError> {
        let mut state = self.state.write().await;
        let row = state.bookings.get(&id).ok_or(EngineError::NotFound(id))?;
        if let Some(token) = row.reschedule_token {
            return Ok(token);
        }
        let mut token = Ulid::new();
        while state.by_token.contains_key(&token) {
            token = Ulid::new();
        }
        let event = BookingEvent::TokenIssued {
            id,
            token,
            at: Utc::now(),
        };
        self.persist_and_apply(&mut state, &event).await?;
        Ok(token)
    }

    /// Remove a request entirely, releasing its slot claim and token.
    /// Returns the removed row so the caller can clean up any meeting.
    pub async fn delete(&self, id: Ulid) -> Result<Booking, EngineError> {
        let mut state = self.state.write().await;
        let row = state.bookings.get(&id).cloned().ok_or(EngineError::NotFound(id))?;
        let event = BookingEvent::Deleted { id };
        self.persist_and_apply(&mut state, &event).await?;
        Ok(row)
    }
}
