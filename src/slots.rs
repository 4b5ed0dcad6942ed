//! Fixed catalog of bookable appointment slots (KST-friendly hours).
//! The value is what gets stored; the label is for display.

use chrono::NaiveTime;

pub const APPOINTMENT_TIME_SLOTS: [(&str, &str); 7] = [
    ("09:00-10:00", "9:00 AM – 10:00 AM"),
    ("10:00-11:00", "10:00 AM – 11:00 AM"),
    ("11:00-12:00", "11:00 AM – 12:00 PM"),
    ("14:00-15:00", "2:00 PM – 3:00 PM"),
    ("15:00-16:00", "3:00 PM – 4:00 PM"),
    ("16:00-17:00", "4:00 PM – 5:00 PM"),
    ("17:00-18:00", "5:00 PM – 6:00 PM"),
];

pub fn is_valid_slot(value: &str) -> bool {
    APPOINTMENT_TIME_SLOTS.iter().any(|(v, _)| *v == value)
}

/// Display label for a slot value. Unknown values fall back to the raw value.
pub fn slot_label(value: &str) -> &str {
    APPOINTMENT_TIME_SLOTS
        .iter()
        .find(|(v, _)| *v == value)
        .map(|(_, label)| *label)
        .unwrap_or(value)
}

/// Start time and meeting duration derived from a slot value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTiming {
    pub start: NaiveTime,
    pub duration_minutes: u32,
}

/// Parse "HH:MM-HH:MM" into a start time and duration for meeting creation.
/// Never fails: malformed values fall back to 09:00 for an hour, a zero-length
/// slot becomes an hour, and the duration is clamped to 15..=120 minutes.
pub fn slot_timing(value: &str) -> SlotTiming {
    let fallback = SlotTiming {
        start: NaiveTime::MIN + chrono::Duration::hours(9),
        duration_minutes: 60,
    };

    fn minutes_of(part: &str) -> Option<i32> {
        let (h, m) = part.split_once(':')?;
        if h.len() != 2 || m.len() != 2 {
            return None;
        }
        if !h.bytes().all(|b| b.is_ascii_digit()) || !m.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let h: i32 = h.parse().ok()?;
        let m: i32 = m.parse().ok()?;
        Some(h * 60 + m)
    }

    let trimmed = value.trim();
    let Some((start_part, end_part)) = trimmed.split_once('-') else {
        return fallback;
    };
    let (Some(start_m), Some(end_m)) = (minutes_of(start_part), minutes_of(end_part)) else {
        return fallback;
    };
    let Some(start) = NaiveTime::from_hms_opt(start_m as u32 / 60, start_m as u32 % 60, 0) else {
        return fallback;
    };

    let diff = end_m - start_m;
    let diff = if diff == 0 { 60 } else { diff };
    SlotTiming {
        start,
        duration_minutes: diff.clamp(15, 120) as u32,
    }
}
