//! Metrics setup.
//!
//! Jobs record through the `metrics` facade unconditionally; nothing is
//! collected until [`init_metrics`] installs the Prometheus recorder.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// Histogram buckets for sync durations, in seconds.
const SYNC_DURATION_BUCKETS: &[f64] = &[
    0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0,
];

/// Describes every metric emitted by the sync jobs.
pub fn register_sync_metrics() {
    metrics::describe_counter!(
        "git_syncer_sync_runs_total",
        "Total number of sync attempts, by outcome"
    );
    metrics::describe_histogram!(
        "git_syncer_sync_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent in one sync attempt"
    );
    metrics::describe_gauge!("git_syncer_active_jobs", "Number of jobs still running");
}

/// Installs the Prometheus recorder with a scrape endpoint on `listen`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(listen: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(listen)
        .set_buckets(SYNC_DURATION_BUCKETS)?
        .install()?;

    register_sync_metrics();
    info!("Metrics exporter listening on {}", listen);
    Ok(())
}
