use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::windows::free_spans;
use super::{Engine, EngineError, SharedResourceState};

fn event_info(event: &EventState, resource_id: Ulid) -> EventInfo {
    EventInfo {
        id: event.id,
        resource_id,
        title: event.title.clone(),
        start: event.span.start,
        end: event.span.end,
        kind: event.kind,
        capacity: event.capacity,
        confirmed: event.confirmed_count(None),
    }
}

impl Engine {
    pub async fn list_resources(&self) -> Vec<ResourceInfo> {
        let resources: Vec<SharedResourceState> =
            self.state.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::with_capacity(resources.len());
        for rs in resources {
            let guard = rs.read().await;
            out.push(ResourceInfo {
                id: guard.id,
                name: guard.name.clone(),
                capacity: guard.capacity,
            });
        }
        out
    }

    /// All events scheduled on a resource, in start order. Unknown
    /// resources read as empty schedules.
    pub async fn get_events(&self, resource_id: Ulid) -> Result<Vec<EventInfo>, EngineError> {
        let rs = match self.get_resource(&resource_id) {
            Some(rs) => rs,
            None => return Ok(vec![]),
        };
        let guard = rs.read().await;
        Ok(guard
            .events
            .iter()
            .map(|e| event_info(e, resource_id))
            .collect())
    }

    /// Events on a resource intersecting `[start, end)` — what the
    /// schedule board shows for one day or week.
    pub async fn events_in_window(
        &self,
        resource_id: Ulid,
        start: Ms,
        end: Ms,
    ) -> Result<Vec<EventInfo>, EngineError> {
        if end <= start {
            return Err(EngineError::InvalidInterval("window end must be after start"));
        }
        if end - start > MAX_QUERY_WINDOW_MS {
            return Err(EngineError::LimitExceeded("query window too wide"));
        }
        let rs = match self.get_resource(&resource_id) {
            Some(rs) => rs,
            None => return Ok(vec![]),
        };
        let guard = rs.read().await;
        let query = Span::new(start, end);
        Ok(guard
            .overlapping(&query)
            .map(|e| event_info(e, resource_id))
            .collect())
    }

    /// All reservations of an event, cancelled ones included.
    pub async fn get_reservations(
        &self,
        event_id: Ulid,
    ) -> Result<Vec<ReservationInfo>, EngineError> {
        let resource_id = match self.resource_for_event(&event_id) {
            Some(rid) => rid,
            None => return Ok(vec![]),
        };
        let rs = self
            .get_resource(&resource_id)
            .ok_or(EngineError::NotFound(resource_id))?;
        let guard = rs.read().await;
        let event = guard
            .event(&event_id)
            .ok_or(EngineError::NotFound(event_id))?;
        Ok(event
            .reservations
            .iter()
            .map(|r| ReservationInfo {
                id: r.id,
                event_id,
                person_id: r.person_id,
                status: r.status,
            })
            .collect())
    }

    /// Confirmed seats vs effective capacity for one event.
    pub async fn event_occupancy(&self, event_id: Ulid) -> Result<Occupancy, EngineError> {
        let resource_id = self
            .resource_for_event(&event_id)
            .ok_or(EngineError::NotFound(event_id))?;
        let rs = self
            .get_resource(&resource_id)
            .ok_or(EngineError::NotFound(resource_id))?;
        let guard = rs.read().await;
        let event = guard
            .event(&event_id)
            .ok_or(EngineError::NotFound(event_id))?;
        let confirmed = event.confirmed_count(None);
        let capacity = event.effective_capacity(guard.capacity);
        Ok(Occupancy {
            event_id,
            confirmed,
            capacity,
            is_full: confirmed >= capacity,
        })
    }

    /// Open slots on a resource: the query window minus the union of event
    /// spans, optionally dropping fragments shorter than `min_duration_ms`.
    pub async fn free_windows(
        &self,
        resource_id: Ulid,
        query_start: Ms,
        query_end: Ms,
        min_duration_ms: Option<Ms>,
    ) -> Result<Vec<Span>, EngineError> {
        if query_end <= query_start {
            return Err(EngineError::InvalidInterval("window end must be after start"));
        }
        if query_end - query_start > MAX_QUERY_WINDOW_MS {
            return Err(EngineError::LimitExceeded("query window too wide"));
        }
        let rs = match self.get_resource(&resource_id) {
            Some(rs) => rs,
            None => return Ok(vec![]),
        };
        let guard = rs.read().await;

        let query = Span::new(query_start, query_end);
        let occupied: Vec<Span> = guard.overlapping(&query).map(|e| e.span).collect();
        let mut free = free_spans(&occupied, &query);

        if let Some(min_dur) = min_duration_ms {
            free.retain(|span| span.duration_ms() >= min_dur);
        }

        Ok(free)
    }
}
