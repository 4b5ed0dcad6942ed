//! Size caps for stored request data. Keeps rows bounded and prevents abuse.

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_EMAIL_LEN: usize = 320;
pub const MAX_PHONE_LEN: usize = 50;
pub const MAX_LANGUAGE_LEN: usize = 50;
pub const MAX_CATEGORY_LEN: usize = 100;
pub const MAX_MESSAGE_LEN: usize = 10_000;
pub const MAX_INTERNAL_NOTES_LEN: usize = 5_000;
pub const MAX_APPOINTMENT_PREFERENCE_LEN: usize = 500;
pub const MAX_TIME_SLOT_LEN: usize = 20;
pub const MAX_INSTAGRAM_HANDLE_LEN: usize = 100;
pub const MAX_ZOOM_LINK_LEN: usize = 2_000;

/// Submit bodies above this are rejected with 413 before parsing.
pub const MAX_BODY_BYTES: usize = 50_000;
