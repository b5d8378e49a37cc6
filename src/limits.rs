//! Hard caps guarding every unbounded input. Exceeding any of these is a
//! recoverable `LimitExceeded` error, never a panic.

use crate::model::Ms;

pub const MAX_TENANTS: usize = 1024;
pub const MAX_TENANT_NAME_LEN: usize = 256;

pub const MAX_RESOURCES_PER_TENANT: usize = 10_000;
pub const MAX_EVENTS_PER_RESOURCE: usize = 100_000;
pub const MAX_RESERVATIONS_PER_EVENT: usize = 10_000;

pub const MAX_NAME_LEN: usize = 120;
pub const MAX_TITLE_LEN: usize = 140;

/// 1970-01-01T00:00:00Z. Negative timestamps are never valid schedule input.
pub const MIN_VALID_TIMESTAMP_MS: Ms = 0;
/// 2100-01-01T00:00:00Z. Anything later is a data-entry error.
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;

/// No single event runs longer than 30 days.
pub const MAX_SPAN_DURATION_MS: Ms = 30 * 24 * 3_600_000;

/// Free-window queries are capped at a one-year window.
pub const MAX_QUERY_WINDOW_MS: Ms = 366 * 24 * 3_600_000;
