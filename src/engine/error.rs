use ulid::Ulid;

use crate::model::Span;

/// A proposed event window overlaps an existing event on the same resource.
/// Carries the first colliding event found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictError {
    pub event_id: Ulid,
    pub title: String,
    pub span: Span,
}

impl std::fmt::Display for ConflictError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "time slot unavailable: overlaps \"{}\" ({}) [{}, {})",
            self.title, self.event_id, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ConflictError {}

/// Admitting the reservation would exceed the event's effective capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityError {
    pub event_id: Ulid,
    pub confirmed: u32,
    pub capacity: u32,
}

impl std::fmt::Display for CapacityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "event {} is full: {}/{} seats confirmed",
            self.event_id, self.confirmed, self.capacity
        )
    }
}

impl std::error::Error for CapacityError {}

/// Every way an engine operation can be refused. All variants are
/// recoverable, single-operation failures surfaced to the caller.
#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    AlreadyExists(Ulid),
    NameTaken(String),
    HasEvents(Ulid),
    DuplicateReservation { event_id: Ulid, person_id: Ulid },
    AlreadyCancelled(Ulid),
    Conflict(ConflictError),
    CapacityFull(CapacityError),
    InvalidInterval(&'static str),
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::NameTaken(name) => {
                write!(f, "a resource named \"{name}\" already exists")
            }
            EngineError::HasEvents(id) => {
                write!(f, "cannot delete resource {id}: events are scheduled on it")
            }
            EngineError::DuplicateReservation {
                event_id,
                person_id,
            } => {
                write!(
                    f,
                    "person {person_id} already holds a confirmed seat in event {event_id}"
                )
            }
            EngineError::AlreadyCancelled(id) => {
                write!(f, "reservation {id} is already cancelled")
            }
            EngineError::Conflict(e) => write!(f, "{e}"),
            EngineError::CapacityFull(e) => write!(f, "{e}"),
            EngineError::InvalidInterval(msg) => write!(f, "invalid interval: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<ConflictError> for EngineError {
    fn from(e: ConflictError) -> Self {
        EngineError::Conflict(e)
    }
}

impl From<CapacityError> for EngineError {
    fn from(e: CapacityError) -> Self {
        EngineError::CapacityFull(e)
    }
}
