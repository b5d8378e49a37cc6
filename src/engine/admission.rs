use ulid::Ulid;

use crate::model::{EventState, ReservationStatus};

use super::error::CapacityError;

/// The capacity admission controller: may one more seat be claimed?
///
/// A non-confirmed candidate trivially succeeds — cancelled reservations
/// never count against capacity and never need a check. Otherwise the
/// event's confirmed reservations are counted (skipping `excluding` for
/// in-place re-checks) and compared against the effective capacity:
/// the stored event capacity, falling back to the resource capacity when
/// unset, hard-capped at 1 for individual sessions.
///
/// Pure read-then-decide, mirroring the conflict checker's contract. No
/// queue, no waitlist: first-come-first-served is a property of the
/// serialized write path, not of this function.
pub fn check_capacity(
    event: &EventState,
    resource_capacity: u32,
    status: ReservationStatus,
    excluding: Option<Ulid>,
) -> Result<(), CapacityError> {
    if status != ReservationStatus::Confirmed {
        return Ok(());
    }
    let confirmed = event.confirmed_count(excluding);
    let capacity = event.effective_capacity(resource_capacity);
    if confirmed < capacity {
        Ok(())
    } else {
        Err(CapacityError {
            event_id: event.id,
            confirmed,
            capacity,
        })
    }
}
