use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only time type.
pub type Ms = i64;

/// Half-open interval `[start, end)`. Two spans that merely touch at an
/// endpoint do not overlap, so back-to-back events are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

/// How an event admits participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Drop-in session, capacity-bound only.
    Open,
    /// Scheduled class for a group, capacity-bound only.
    Group,
    /// One-on-one session; admits a single participant regardless of the
    /// stored capacity value.
    Individual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
}

/// A person's claim on one seat of an event. Cancelled reservations are
/// kept (they no longer count against capacity and don't block re-booking).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub person_id: Ulid,
    pub status: ReservationStatus,
}

/// A scheduled occupation of a resource, carrying its seat reservations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventState {
    pub id: Ulid,
    pub title: String,
    pub span: Span,
    pub kind: EventKind,
    /// Seat ceiling; 0 means "unset — use the resource capacity".
    pub capacity: u32,
    pub reservations: Vec<Reservation>,
}

impl EventState {
    pub fn new(id: Ulid, title: String, span: Span, kind: EventKind, capacity: u32) -> Self {
        Self {
            id,
            title,
            span,
            kind,
            capacity,
            reservations: Vec::new(),
        }
    }

    /// Count reservations with status Confirmed, skipping `excluding`
    /// (self-exclusion for in-place re-checks).
    pub fn confirmed_count(&self, excluding: Option<Ulid>) -> u32 {
        self.reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Confirmed)
            .filter(|r| excluding != Some(r.id))
            .count() as u32
    }

    /// The seat ceiling actually used for admission. Individual events are
    /// hard-capped at one participant; a stored capacity of 0 falls back to
    /// the resource capacity (it never means zero seats).
    pub fn effective_capacity(&self, resource_capacity: u32) -> u32 {
        if self.kind == EventKind::Individual {
            return 1;
        }
        if self.capacity > 0 {
            self.capacity
        } else {
            resource_capacity
        }
    }

    pub fn reservation(&self, id: &Ulid) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == *id)
    }

    pub fn reservation_mut(&mut self, id: &Ulid) -> Option<&mut Reservation> {
        self.reservations.iter_mut().find(|r| r.id == *id)
    }

    /// True if `person_id` already holds a confirmed seat here.
    pub fn has_confirmed_for(&self, person_id: Ulid) -> bool {
        self.reservations
            .iter()
            .any(|r| r.person_id == person_id && r.status == ReservationStatus::Confirmed)
    }
}

/// A bookable unit (room/court/studio) and everything scheduled on it.
#[derive(Debug, Clone)]
pub struct ResourceState {
    pub id: Ulid,
    pub name: String,
    /// Default seat count for events that don't set their own.
    pub capacity: u32,
    /// Scheduled events, sorted by `span.start`.
    pub events: Vec<EventState>,
}

impl ResourceState {
    pub fn new(id: Ulid, name: String, capacity: u32) -> Self {
        Self {
            id,
            name,
            capacity,
            events: Vec::new(),
        }
    }

    /// Insert an event maintaining sort order by span.start.
    pub fn insert_event(&mut self, event: EventState) {
        let pos = self
            .events
            .binary_search_by_key(&event.span.start, |e| e.span.start)
            .unwrap_or_else(|e| e);
        self.events.insert(pos, event);
    }

    /// Remove an event by id, returning it (reservations included).
    pub fn remove_event(&mut self, id: &Ulid) -> Option<EventState> {
        let pos = self.events.iter().position(|e| e.id == *id)?;
        Some(self.events.remove(pos))
    }

    pub fn event(&self, id: &Ulid) -> Option<&EventState> {
        self.events.iter().find(|e| e.id == *id)
    }

    pub fn event_mut(&mut self, id: &Ulid) -> Option<&mut EventState> {
        self.events.iter_mut().find(|e| e.id == *id)
    }

    /// Return only events whose span overlaps the query window.
    /// Uses binary search to skip events starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &EventState> {
        // Everything at index >= right_bound starts at or after query.end → can't overlap.
        let right_bound = self.events.partition_point(|e| e.span.start < query.end);
        self.events[..right_bound]
            .iter()
            .filter(move |e| e.span.end > query.start)
    }
}

/// One accepted state transition — the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    ResourceCreated {
        id: Ulid,
        name: String,
        capacity: u32,
    },
    ResourceUpdated {
        id: Ulid,
        name: String,
        capacity: u32,
    },
    ResourceDeleted {
        id: Ulid,
    },
    EventScheduled {
        id: Ulid,
        resource_id: Ulid,
        title: String,
        span: Span,
        kind: EventKind,
        capacity: u32,
    },
    EventUpdated {
        id: Ulid,
        resource_id: Ulid,
        title: String,
        span: Span,
        kind: EventKind,
        capacity: u32,
    },
    EventDeleted {
        id: Ulid,
        resource_id: Ulid,
    },
    ReservationConfirmed {
        id: Ulid,
        resource_id: Ulid,
        event_id: Ulid,
        person_id: Ulid,
    },
    ReservationCancelled {
        id: Ulid,
        resource_id: Ulid,
        event_id: Ulid,
    },
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInfo {
    pub id: Ulid,
    pub name: String,
    pub capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInfo {
    pub id: Ulid,
    pub resource_id: Ulid,
    pub title: String,
    pub start: Ms,
    pub end: Ms,
    pub kind: EventKind,
    pub capacity: u32,
    pub confirmed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationInfo {
    pub id: Ulid,
    pub event_id: Ulid,
    pub person_id: Ulid,
    pub status: ReservationStatus,
}

/// Seat usage of one event, as shown on the schedule board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    pub event_id: Ulid,
    pub confirmed: u32,
    pub capacity: u32,
    pub is_full: bool,
}
