use ulid::Ulid;

#[derive(Debug)]
pub enum EngineError {
    /// Rejected input; the message is shown to the caller as-is.
    Validation(&'static str),
    /// The requested date and time slot is held by another active request.
    SlotTaken,
    NotFound(Ulid),
    /// No request carries the presented reschedule token.
    TokenNotFound,
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "{msg}"),
            EngineError::SlotTaken => write!(f, "date and time slot already taken"),
            EngineError::NotFound(id) => write!(f, "request not found: {id}"),
            EngineError::TokenNotFound => write!(f, "no request matches that reschedule token"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
