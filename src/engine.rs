mod conflict;
mod error;
mod mutations;
mod queries;

pub use error::EngineError;
pub use mutations::Reschedule;

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::time::Instant;

use tokio::sync::{Mutex, RwLock};
use tracing::info;
use ulid::Ulid;

use crate::model::{Booking, BookingEvent};
use crate::observability;
use crate::wal::Wal;

use conflict::SlotIndex;

// Startup compaction: rewrite the log once replay work dwarfs the live set.
const COMPACT_REPLAY_FACTOR: usize = 4;
const COMPACT_REPLAY_FLOOR: usize = 64;

/// In-memory store rebuilt from the WAL at startup.
///
/// `slot_index` holds one claim per (date, slot) pair, owned by the active
/// request occupying it. Inactive requests never appear in the index.
#[derive(Default)]
pub(crate) struct StoreState {
    pub(crate) bookings: HashMap<Ulid, Booking>,
    pub(crate) by_token: HashMap<Ulid, Ulid>,
    pub(crate) slot_index: SlotIndex,
}

/// Apply an event to the store. The caller holds the write lock; replay is
/// single-threaded. Events referencing unknown ids are skipped (a truncated
/// log can lose the row they belonged to).
fn apply_event(state: &mut StoreState, event: &BookingEvent) {
    match event {
        BookingEvent::Submitted { booking } => {
            if booking.holds_slot()
                && let (Some(date), Some(slot)) =
                    (booking.appointment_date, booking.appointment_time_slot.as_deref())
            {
                conflict::claim(&mut state.slot_index, date, slot, booking.id);
            }
            if let Some(token) = booking.reschedule_token {
                state.by_token.insert(token, booking.id);
            }
            state.bookings.insert(booking.id, booking.clone());
        }
        BookingEvent::ScheduleChanged { id, date, slot, at } => {
            let Some(row) = state.bookings.get_mut(id) else { return };
            if row.holds_slot()
                && let (Some(old_date), Some(old_slot)) =
                    (row.appointment_date, row.appointment_time_slot.as_deref())
            {
                conflict::release(&mut state.slot_index, old_date, old_slot, *id);
            }
            row.appointment_date = Some(*date);
            row.appointment_time_slot = Some(slot.clone());
            // Any meeting link was for the old time.
            row.zoom_link = None;
            row.zoom_meeting_id = None;
            row.updated_at = *at;
            if row.holds_slot() {
                conflict::claim(&mut state.slot_index, *date, slot, *id);
            }
        }
        BookingEvent::StatusNotesUpdated { id, status, notes, at } => {
            let Some(row) = state.bookings.get_mut(id) else { return };
            let held_before = row.holds_slot();
            if let Some(s) = status {
                row.status = *s;
            }
            if let Some(n) = notes {
                row.internal_notes = n.clone();
            }
            row.updated_at = *at;
            let held_after = row.holds_slot();
            if held_before != held_after
                && let (Some(date), Some(slot)) =
                    (row.appointment_date, row.appointment_time_slot.as_deref())
            {
                if held_after {
                    conflict::claim(&mut state.slot_index, date, slot, *id);
                } else {
                    conflict::release(&mut state.slot_index, date, slot, *id);
                }
            }
        }
        BookingEvent::MeetingLinked { id, link, meeting_id, at } => {
            let Some(row) = state.bookings.get_mut(id) else { return };
            row.zoom_link = Some(link.clone());
            row.zoom_meeting_id = meeting_id.clone();
            row.updated_at = *at;
        }
        BookingEvent::TokenIssued { id, token, at } => {
            let Some(row) = state.bookings.get_mut(id) else { return };
            if let Some(old) = row.reschedule_token.replace(*token) {
                state.by_token.remove(&old);
            }
            row.updated_at = *at;
            state.by_token.insert(*token, *id);
        }
        BookingEvent::Deleted { id } => {
            let Some(row) = state.bookings.remove(id) else { return };
            if row.holds_slot()
                && let (Some(date), Some(slot)) =
                    (row.appointment_date, row.appointment_time_slot.as_deref())
            {
                conflict::release(&mut state.slot_index, date, slot, *id);
            }
            if let Some(token) = row.reschedule_token {
                state.by_token.remove(&token);
            }
        }
    }
}

pub struct Engine {
    state: RwLock<StoreState>,
    wal: Mutex<Wal>,
}

impl Engine {
    /// Replay the WAL into memory and open it for appends. Compacts the log
    /// first when replay visited far more events than there are live rows.
    pub fn open(wal_path: PathBuf) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let mut state = StoreState::default();
        for event in &events {
            apply_event(&mut state, event);
        }

        let mut wal = Wal::open(&wal_path)?;
        let replayed = events.len();
        let live = state.bookings.len();
        if replayed > live * COMPACT_REPLAY_FACTOR + COMPACT_REPLAY_FLOOR {
            let mut rows: Vec<&Booking> = state.bookings.values().collect();
            rows.sort_by_key(|b| b.id);
            let snapshot: Vec<BookingEvent> = rows
                .into_iter()
                .map(|b| BookingEvent::Submitted { booking: b.clone() })
                .collect();
            wal.compact(&snapshot)?;
            info!(replayed, live, "compacted request log");
        }

        Ok(Self {
            state: RwLock::new(state),
            wal: Mutex::new(wal),
        })
    }

    /// WAL-append + apply in one call, under the caller's write lock. The
    /// append is fsynced before the in-memory state changes, so an event is
    /// never visible unless it is durable.
    pub(super) async fn persist_and_apply(
        &self,
        state: &mut StoreState,
        event: &BookingEvent,
    ) -> Result<(), EngineError> {
        let started = Instant::now();
        {
            let mut wal = self.wal.lock().await;
            wal.append(event)
                .map_err(|e| EngineError::WalError(e.to_string()))?;
        }
        metrics::histogram!(observability::WAL_APPEND_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        apply_event(state, event);
        Ok(())
    }
}
