mod admission;
mod conflict;
mod error;
mod mutations;
mod queries;
mod windows;

pub use admission::check_capacity;
pub use conflict::check_no_conflict;
pub use error::{CapacityError, ConflictError, EngineError};
pub use windows::{free_spans, merge_overlapping, subtract_intervals};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, oneshot};
use ulid::Ulid;

use crate::model::*;
use crate::wal::Wal;

pub type SharedResourceState = Arc<RwLock<ResourceState>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        change: Change,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        changes: Vec<Change>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit:
/// block until an Append arrives, drain every immediately available Append
/// into one batch, then fsync once for the whole batch and respond to all
/// senders. Non-append commands flush the pending batch first.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        let mut batch = match cmd {
            WalCommand::Append { change, response } => vec![(change, response)],
            other => {
                handle_non_append(&mut wal, other);
                continue;
            }
        };

        let mut deferred = None;
        loop {
            match rx.try_recv() {
                Ok(WalCommand::Append { change, response }) => batch.push((change, response)),
                Ok(other) => {
                    // Flush the batch before acting on the non-append command.
                    deferred = Some(other);
                    break;
                }
                Err(_) => break, // channel empty
            }
        }

        flush_batch(&mut wal, batch);
        if let Some(cmd) = deferred {
            handle_non_append(&mut wal, cmd);
        }
    }
}

fn flush_batch(wal: &mut Wal, batch: Vec<(Change, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();

    let mut append_err: Option<io::Error> = None;
    for (change, _) in &batch {
        if let Err(e) = wal.append_buffered(change) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even on append error — so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = wal.flush_sync().err();
    let result = match append_err.or(flush_err) {
        Some(e) => Err(e),
        None => Ok(()),
    };

    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());

    for (_, tx) in batch {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { changes, response } => {
            let result = Wal::write_compact_file(wal.path(), &changes)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

/// One tenant's scheduling state machine. Every write path runs its
/// validation gate while holding the target resource's write lock, so
/// check-then-persist is atomic with respect to other writers on that
/// resource (and, since reservations live inside their event's resource,
/// per event as well).
pub struct Engine {
    pub state: DashMap<Ulid, SharedResourceState>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    /// Reverse lookup: event id → resource id.
    pub(super) event_to_resource: DashMap<Ulid, Ulid>,
    /// Reverse lookup: reservation id → event id.
    pub(super) reservation_to_event: DashMap<Ulid, Ulid>,
}

impl Engine {
    pub fn new(wal_path: PathBuf) -> io::Result<Self> {
        let changes = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            state: DashMap::new(),
            wal_tx,
            event_to_resource: DashMap::new(),
            reservation_to_event: DashMap::new(),
        };

        // Replay — we're the sole owner of these Arcs, so try_write always
        // succeeds instantly. Never use blocking_write here: this may run
        // inside an async context (lazy tenant creation).
        for change in &changes {
            match change {
                Change::ResourceCreated { id, name, capacity } => {
                    let rs = ResourceState::new(*id, name.clone(), *capacity);
                    engine.state.insert(*id, Arc::new(RwLock::new(rs)));
                }
                Change::ResourceDeleted { id } => {
                    engine.state.remove(id);
                }
                other => {
                    if let Some(resource_id) = change_resource_id(other)
                        && let Some(rs) = engine.get_resource(&resource_id) {
                            let mut guard = rs.try_write().expect("replay: uncontended write");
                            engine.apply_change(&mut guard, other);
                        }
                }
            }
        }

        Ok(engine)
    }

    /// Write a change to the WAL via the background group-commit writer.
    pub(super) async fn wal_append(&self, change: &Change) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                change: change.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub fn get_resource(&self, id: &Ulid) -> Option<SharedResourceState> {
        self.state.get(id).map(|e| e.value().clone())
    }

    pub fn resource_for_event(&self, event_id: &Ulid) -> Option<Ulid> {
        self.event_to_resource.get(event_id).map(|e| *e.value())
    }

    pub fn event_for_reservation(&self, reservation_id: &Ulid) -> Option<Ulid> {
        self.reservation_to_event
            .get(reservation_id)
            .map(|e| *e.value())
    }

    /// WAL-append + apply in one call: the standard accept path after a
    /// gate succeeds under the resource write lock.
    pub(super) async fn persist_and_apply(
        &self,
        rs: &mut ResourceState,
        change: &Change,
    ) -> Result<(), EngineError> {
        self.wal_append(change).await?;
        self.apply_change(rs, change);
        Ok(())
    }

    /// Lookup event → resource, get resource, acquire write lock.
    pub(super) async fn resolve_event_write(
        &self,
        event_id: &Ulid,
    ) -> Result<(Ulid, tokio::sync::OwnedRwLockWriteGuard<ResourceState>), EngineError> {
        let resource_id = self
            .resource_for_event(event_id)
            .ok_or(EngineError::NotFound(*event_id))?;
        let rs = self
            .get_resource(&resource_id)
            .ok_or(EngineError::NotFound(resource_id))?;
        let guard = rs.write_owned().await;
        Ok((resource_id, guard))
    }

    /// Lookup reservation → event → resource, acquire resource write lock.
    pub(super) async fn resolve_reservation_write(
        &self,
        reservation_id: &Ulid,
    ) -> Result<(Ulid, Ulid, tokio::sync::OwnedRwLockWriteGuard<ResourceState>), EngineError>
    {
        let event_id = self
            .event_for_reservation(reservation_id)
            .ok_or(EngineError::NotFound(*reservation_id))?;
        let (resource_id, guard) = self.resolve_event_write(&event_id).await?;
        Ok((resource_id, event_id, guard))
    }

    /// Apply a change to a ResourceState (no locking — caller holds the
    /// lock) and keep the reverse indexes in step.
    pub(super) fn apply_change(&self, rs: &mut ResourceState, change: &Change) {
        match change {
            Change::EventScheduled {
                id,
                resource_id,
                title,
                span,
                kind,
                capacity,
            } => {
                rs.insert_event(EventState::new(*id, title.clone(), *span, *kind, *capacity));
                self.event_to_resource.insert(*id, *resource_id);
            }
            Change::EventUpdated {
                id,
                title,
                span,
                kind,
                capacity,
                ..
            } => {
                // Remove and reinsert so the sort order tracks the new start;
                // reservations are carried over untouched.
                if let Some(mut event) = rs.remove_event(id) {
                    event.title = title.clone();
                    event.span = *span;
                    event.kind = *kind;
                    event.capacity = *capacity;
                    rs.insert_event(event);
                }
            }
            Change::EventDeleted { id, .. } => {
                if let Some(event) = rs.remove_event(id) {
                    for r in &event.reservations {
                        self.reservation_to_event.remove(&r.id);
                    }
                }
                self.event_to_resource.remove(id);
            }
            Change::ReservationConfirmed {
                id,
                event_id,
                person_id,
                ..
            } => {
                if let Some(event) = rs.event_mut(event_id) {
                    event.reservations.push(Reservation {
                        id: *id,
                        person_id: *person_id,
                        status: ReservationStatus::Confirmed,
                    });
                    self.reservation_to_event.insert(*id, *event_id);
                }
            }
            Change::ReservationCancelled { id, event_id, .. } => {
                if let Some(event) = rs.event_mut(event_id)
                    && let Some(r) = event.reservation_mut(id) {
                        r.status = ReservationStatus::Cancelled;
                    }
            }
            Change::ResourceUpdated { name, capacity, .. } => {
                rs.name = name.clone();
                rs.capacity = *capacity;
            }
            // Created/Deleted are handled at the DashMap level, not here.
            Change::ResourceCreated { .. } | Change::ResourceDeleted { .. } => {}
        }
    }
}

/// Extract the owning resource id from a change (None for resource
/// creation/deletion, which are handled at the map level).
fn change_resource_id(change: &Change) -> Option<Ulid> {
    match change {
        Change::EventScheduled { resource_id, .. }
        | Change::EventUpdated { resource_id, .. }
        | Change::EventDeleted { resource_id, .. }
        | Change::ReservationConfirmed { resource_id, .. }
        | Change::ReservationCancelled { resource_id, .. } => Some(*resource_id),
        Change::ResourceUpdated { id, .. } => Some(*id),
        Change::ResourceCreated { .. } | Change::ResourceDeleted { .. } => None,
    }
}
