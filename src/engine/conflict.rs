use std::collections::BTreeMap;

use chrono::NaiveDate;
use ulid::Ulid;

use super::EngineError;

pub(crate) type SlotIndex = BTreeMap<(NaiveDate, String), Ulid>;

/// Reject if another active request already holds (date, slot). `exclude`
/// lets a request move within its own claim.
pub(crate) fn check_slot_free(
    index: &SlotIndex,
    date: NaiveDate,
    slot: &str,
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    match index.get(&(date, slot.to_string())) {
        Some(holder) if exclude != Some(*holder) => Err(EngineError::SlotTaken),
        _ => Ok(()),
    }
}

pub(crate) fn claim(index: &mut SlotIndex, date: NaiveDate, slot: &str, holder: Ulid) {
    index.insert((date, slot.to_string()), holder);
}

/// Remove a claim, but only if this holder still owns it. Replayed logs can
/// contain overlapping histories; never drop someone else's claim.
pub(crate) fn release(index: &mut SlotIndex, date: NaiveDate, slot: &str, holder: Ulid) {
    let key = (date, slot.to_string());
    if index.get(&key) == Some(&holder) {
        index.remove(&key);
    }
}
