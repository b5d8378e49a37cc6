use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: events accepted by the conflict gate and persisted.
pub const EVENTS_SCHEDULED_TOTAL: &str = "bookgate_events_scheduled_total";

/// Counter: event writes rejected by the conflict checker.
pub const SCHEDULING_CONFLICTS_TOTAL: &str = "bookgate_scheduling_conflicts_total";

/// Counter: reservations admitted and persisted.
pub const RESERVATIONS_CONFIRMED_TOTAL: &str = "bookgate_reservations_confirmed_total";

/// Counter: reservations rejected by the capacity gate.
pub const RESERVATIONS_REJECTED_TOTAL: &str = "bookgate_reservations_rejected_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: number of active tenants (loaded engines).
pub const TENANTS_ACTIVE: &str = "bookgate_tenants_active";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "bookgate_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (changes per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "bookgate_wal_flush_batch_size";

/// Install the Prometheus metrics exporter on the given port. No-op if
/// `port` is None — the metrics facade then records into the void, which
/// is the default for library consumers that bring their own recorder.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
