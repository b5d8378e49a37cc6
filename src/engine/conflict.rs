use ulid::Ulid;

use crate::model::{Ms, ResourceState, Span};

use super::error::{ConflictError, EngineError};

/// Prior invariant gate: a window must be chronologically ordered, inside
/// the valid timestamp range, and not absurdly wide. Runs before conflict
/// checking — overlap semantics are ill-defined for an inverted interval.
pub(crate) fn validate_span(span: &Span) -> Result<(), EngineError> {
    use crate::limits::*;
    if span.end <= span.start {
        return Err(EngineError::InvalidInterval("ends_at must be after starts_at"));
    }
    if span.start < MIN_VALID_TIMESTAMP_MS || span.end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    if span.duration_ms() > MAX_SPAN_DURATION_MS {
        return Err(EngineError::LimitExceeded("span too wide"));
    }
    Ok(())
}

/// The conflict checker: may the candidate window occupy this resource?
///
/// Scans the resource's events for half-open interval intersection
/// (`a.start < b.end && b.start < a.end` — touching endpoints are fine),
/// skipping `excluding` so an in-place edit never collides with itself.
/// If either timestamp is absent the check is a no-op success; presence
/// validation is the caller's concern, not this gate's.
///
/// Pure read-then-decide over a consistent snapshot: the caller holds the
/// resource lock and persists the candidate only on success.
pub fn check_no_conflict(
    rs: &ResourceState,
    starts_at: Option<Ms>,
    ends_at: Option<Ms>,
    excluding: Option<Ulid>,
) -> Result<(), ConflictError> {
    let (Some(start), Some(end)) = (starts_at, ends_at) else {
        return Ok(());
    };
    let candidate = Span::new(start, end);
    for event in rs.overlapping(&candidate) {
        if excluding == Some(event.id) {
            continue;
        }
        return Err(ConflictError {
            event_id: event.id,
            title: event.title.clone(),
            span: event.span,
        });
    }
    Ok(())
}
