use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::Booking;

use super::Engine;

impl Engine {
    pub async fn get(&self, id: Ulid) -> Option<Booking> {
        self.state.read().await.bookings.get(&id).cloned()
    }

    pub async fn find_by_token(&self, token: Ulid) -> Option<Booking> {
        let state = self.state.read().await;
        let id = state.by_token.get(&token)?;
        state.bookings.get(id).cloned()
    }

    /// All requests, newest first.
    pub async fn list_all(&self) -> Vec<Booking> {
        let state = self.state.read().await;
        let mut rows: Vec<Booking> = state.bookings.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows
    }

    /// Slot values claimed by active requests on `date`, in slot order. A
    /// request looking to move (identified by its token) does not count its
    /// own claim as taken.
    pub async fn taken_slots(&self, date: NaiveDate, exclude_token: Option<Ulid>) -> Vec<String> {
        let state = self.state.read().await;
        let own_id = exclude_token.and_then(|t| state.by_token.get(&t).copied());
        state
            .slot_index
            .range((date, String::new())..)
            .take_while(|((d, _), _)| *d == date)
            .filter(|(_, holder)| Some(**holder) != own_id)
            .map(|((_, slot), _)| slot.clone())
            .collect()
    }

    pub async fn request_count(&self) -> usize {
        self.state.read().await.bookings.len()
    }
}
