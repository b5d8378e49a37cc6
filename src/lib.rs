//! bookgate — the scheduling and capacity core of a multi-tenant studio
//! management backend.
//!
//! Each tenant gets an isolated [`engine::Engine`] holding its bookable
//! resources, the events that occupy them, and the seat reservations inside
//! those events. Two validation gates guard every write: the conflict
//! checker (no two events may overlap on one resource) and the capacity
//! admission controller (confirmed seats never exceed effective capacity).
//! Accepted changes are durably appended to a per-tenant WAL.

pub mod compactor;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod tenant;
pub mod wal;

pub use engine::{CapacityError, ConflictError, Engine, EngineError};
