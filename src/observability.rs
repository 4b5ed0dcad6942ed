use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: accepted help-request submissions.
pub const SUBMISSIONS_TOTAL: &str = "livable_submissions_total";

/// Counter: successful self-service reschedules.
pub const RESCHEDULES_TOTAL: &str = "livable_reschedules_total";

/// Counter: writes rejected because the slot was already taken.
pub const SLOT_CONFLICTS_TOTAL: &str = "livable_slot_conflicts_total";

/// Counter: submissions rejected by the per-client rate limit.
pub const RATE_LIMITED_TOTAL: &str = "livable_rate_limited_total";

// ── Integrations ────────────────────────────────────────────────

/// Counter: Zoom meetings created for appointments.
pub const ZOOM_MEETINGS_CREATED_TOTAL: &str = "livable_zoom_meetings_created_total";

/// Counter: Zoom meetings cancelled after a request was deleted.
pub const ZOOM_MEETINGS_CANCELLED_TOTAL: &str = "livable_zoom_meetings_cancelled_total";

// ── Durability ──────────────────────────────────────────────────

/// Histogram: WAL append+fsync duration in seconds.
pub const WAL_APPEND_DURATION_SECONDS: &str = "livable_wal_append_duration_seconds";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
