use std::sync::Arc;

use tokio::sync::{RwLock, oneshot};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::admission::check_capacity;
use super::conflict::{check_no_conflict, validate_span};
use super::{Engine, EngineError, SharedResourceState, WalCommand};

impl Engine {
    pub async fn create_resource(
        &self,
        id: Ulid,
        name: String,
        capacity: u32,
    ) -> Result<(), EngineError> {
        if self.state.len() >= MAX_RESOURCES_PER_TENANT {
            return Err(EngineError::LimitExceeded("too many resources"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("resource name too long"));
        }
        if capacity == 0 {
            return Err(EngineError::LimitExceeded("resource capacity must be positive"));
        }
        if self.state.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        if self.name_taken(&name, None).await {
            return Err(EngineError::NameTaken(name));
        }

        let change = Change::ResourceCreated {
            id,
            name: name.clone(),
            capacity,
        };
        self.wal_append(&change).await?;
        let rs = ResourceState::new(id, name, capacity);
        self.state.insert(id, Arc::new(RwLock::new(rs)));
        Ok(())
    }

    pub async fn update_resource(
        &self,
        id: Ulid,
        name: String,
        capacity: u32,
    ) -> Result<(), EngineError> {
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("resource name too long"));
        }
        if capacity == 0 {
            return Err(EngineError::LimitExceeded("resource capacity must be positive"));
        }
        // Checked before taking our own write lock — name_taken read-locks
        // every resource, including this one.
        if self.name_taken(&name, Some(id)).await {
            return Err(EngineError::NameTaken(name));
        }
        let rs = self.get_resource(&id).ok_or(EngineError::NotFound(id))?;
        let mut guard = rs.write().await;

        let change = Change::ResourceUpdated { id, name, capacity };
        self.persist_and_apply(&mut guard, &change).await
    }

    /// Delete a bookable resource. Refused while events are scheduled on it.
    pub async fn delete_resource(&self, id: Ulid) -> Result<(), EngineError> {
        let rs = self.get_resource(&id).ok_or(EngineError::NotFound(id))?;
        let guard = rs.write().await;
        if !guard.events.is_empty() {
            return Err(EngineError::HasEvents(id));
        }

        let change = Change::ResourceDeleted { id };
        self.wal_append(&change).await?;
        self.state.remove(&id);
        Ok(())
    }

    /// Schedule an event onto a resource. The conflict gate runs under the
    /// resource write lock; the candidate is persisted only on success.
    pub async fn schedule_event(
        &self,
        id: Ulid,
        resource_id: Ulid,
        title: String,
        span: Span,
        kind: EventKind,
        capacity: u32,
    ) -> Result<(), EngineError> {
        validate_span(&span)?;
        if title.len() > MAX_TITLE_LEN {
            return Err(EngineError::LimitExceeded("event title too long"));
        }
        let rs = self
            .get_resource(&resource_id)
            .ok_or(EngineError::NotFound(resource_id))?;
        let mut guard = rs.write().await;
        if guard.events.len() >= MAX_EVENTS_PER_RESOURCE {
            return Err(EngineError::LimitExceeded("too many events on resource"));
        }
        if self.event_to_resource.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        if let Err(conflict) = check_no_conflict(&guard, Some(span.start), Some(span.end), None) {
            metrics::counter!(observability::SCHEDULING_CONFLICTS_TOTAL).increment(1);
            return Err(conflict.into());
        }

        let change = Change::EventScheduled {
            id,
            resource_id,
            title,
            span,
            kind,
            capacity,
        };
        self.persist_and_apply(&mut guard, &change).await?;
        metrics::counter!(observability::EVENTS_SCHEDULED_TOTAL).increment(1);
        Ok(())
    }

    /// Rewrite an event in place (title, window, kind, capacity). The
    /// conflict gate runs with the event excluded from the scan — an event
    /// never conflicts with itself during an edit. Reservations are kept.
    pub async fn update_event(
        &self,
        id: Ulid,
        title: String,
        span: Span,
        kind: EventKind,
        capacity: u32,
    ) -> Result<(), EngineError> {
        validate_span(&span)?;
        if title.len() > MAX_TITLE_LEN {
            return Err(EngineError::LimitExceeded("event title too long"));
        }
        let (resource_id, mut guard) = self.resolve_event_write(&id).await?;

        if let Err(conflict) = check_no_conflict(&guard, Some(span.start), Some(span.end), Some(id))
        {
            metrics::counter!(observability::SCHEDULING_CONFLICTS_TOTAL).increment(1);
            return Err(conflict.into());
        }

        let change = Change::EventUpdated {
            id,
            resource_id,
            title,
            span,
            kind,
            capacity,
        };
        self.persist_and_apply(&mut guard, &change).await
    }

    /// Explicitly delete an event, discarding its reservations.
    pub async fn delete_event(&self, id: Ulid) -> Result<(), EngineError> {
        let (resource_id, mut guard) = self.resolve_event_write(&id).await?;
        let change = Change::EventDeleted { id, resource_id };
        self.persist_and_apply(&mut guard, &change).await
    }

    /// Claim one seat in an event. The admission gate runs under the
    /// resource write lock, so two bookings racing for the last seat
    /// serialize and the second observes the first.
    pub async fn confirm_reservation(
        &self,
        id: Ulid,
        event_id: Ulid,
        person_id: Ulid,
    ) -> Result<(), EngineError> {
        let (resource_id, mut guard) = self.resolve_event_write(&event_id).await?;
        if self.reservation_to_event.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        let resource_capacity = guard.capacity;
        let event = guard
            .event(&event_id)
            .ok_or(EngineError::NotFound(event_id))?;
        if event.reservations.len() >= MAX_RESERVATIONS_PER_EVENT {
            return Err(EngineError::LimitExceeded("too many reservations on event"));
        }
        if event.has_confirmed_for(person_id) {
            return Err(EngineError::DuplicateReservation {
                event_id,
                person_id,
            });
        }

        if let Err(full) = check_capacity(
            event,
            resource_capacity,
            ReservationStatus::Confirmed,
            None,
        ) {
            metrics::counter!(observability::RESERVATIONS_REJECTED_TOTAL).increment(1);
            return Err(full.into());
        }

        let change = Change::ReservationConfirmed {
            id,
            resource_id,
            event_id,
            person_id,
        };
        self.persist_and_apply(&mut guard, &change).await?;
        metrics::counter!(observability::RESERVATIONS_CONFIRMED_TOTAL).increment(1);
        Ok(())
    }

    /// Release a seat: Confirmed → Cancelled. Never consults the admission
    /// gate — a cancellation can only free a slot. There is no transition
    /// out of Cancelled. Cancellation-timing policy (cutoff before start)
    /// belongs to the booking collaborator, not this engine.
    pub async fn cancel_reservation(&self, id: Ulid) -> Result<(), EngineError> {
        let (resource_id, event_id, mut guard) = self.resolve_reservation_write(&id).await?;
        let event = guard
            .event(&event_id)
            .ok_or(EngineError::NotFound(event_id))?;
        let reservation = event.reservation(&id).ok_or(EngineError::NotFound(id))?;
        if reservation.status == ReservationStatus::Cancelled {
            return Err(EngineError::AlreadyCancelled(id));
        }

        let change = Change::ReservationCancelled {
            id,
            resource_id,
            event_id,
        };
        self.persist_and_apply(&mut guard, &change).await
    }

    /// True if another resource in this tenant already uses `name`.
    async fn name_taken(&self, name: &str, excluding: Option<Ulid>) -> bool {
        let resources: Vec<SharedResourceState> =
            self.state.iter().map(|e| e.value().clone()).collect();
        for rs in resources {
            let guard = rs.read().await;
            if excluding != Some(guard.id) && guard.name == name {
                return true;
            }
        }
        false
    }

    /// Compact the WAL by rewriting it with only the changes needed to
    /// recreate the current state.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let mut changes = Vec::new();
        let resources: Vec<SharedResourceState> =
            self.state.iter().map(|e| e.value().clone()).collect();

        for rs in resources {
            let guard = rs.read().await;
            changes.push(Change::ResourceCreated {
                id: guard.id,
                name: guard.name.clone(),
                capacity: guard.capacity,
            });
            for event in &guard.events {
                changes.push(Change::EventScheduled {
                    id: event.id,
                    resource_id: guard.id,
                    title: event.title.clone(),
                    span: event.span,
                    kind: event.kind,
                    capacity: event.capacity,
                });
                for r in &event.reservations {
                    changes.push(Change::ReservationConfirmed {
                        id: r.id,
                        resource_id: guard.id,
                        event_id: event.id,
                        person_id: r.person_id,
                    });
                    if r.status == ReservationStatus::Cancelled {
                        changes.push(Change::ReservationCancelled {
                            id: r.id,
                            resource_id: guard.id,
                            event_id: event.id,
                        });
                    }
                }
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact {
                changes,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
