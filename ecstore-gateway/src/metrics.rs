//! Prometheus Metrics for the ecstore gateway
//!
//! Exposes metrics at GET /metrics in Prometheus text format.
//! Uses the `metrics` crate with prometheus exporter. Recording helpers are
//! no-ops until a recorder is installed.

use axum::{routing::get, Router};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;

/// Install the Prometheus exporter as the global recorder.
/// Returns the handle for rendering metrics on the /metrics endpoint.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Create metrics route that can be merged into any Router
pub fn routes<S: Clone + Send + Sync + 'static>(handle: PrometheusHandle) -> Router<S> {
    let handle = Arc::new(handle);
    Router::new().route(
        "/metrics",
        get(move || {
            let h = handle.clone();
            async move { h.render() }
        }),
    )
}

/// Record a completed upload
pub fn record_upload(bytes: u64) {
    counter!("ecstore_uploads_total").increment(1);
    counter!("ecstore_bytes_uploaded_total").increment(bytes);
}

/// Record a download attempt by outcome ("ok", "not_found", "failed")
pub fn record_download(outcome: &'static str, duration_secs: f64) {
    counter!("ecstore_downloads_total", "outcome" => outcome).increment(1);
    histogram!("ecstore_download_duration_seconds").record(duration_secs);
}

pub fn record_bytes_downloaded(bytes: u64) {
    counter!("ecstore_bytes_downloaded_total").increment(bytes);
}

pub fn record_store_failure() {
    counter!("ecstore_fragment_store_failures_total").increment(1);
}

pub fn record_fetch_failure() {
    counter!("ecstore_fragment_fetch_failures_total").increment(1);
}

/// Record a download that had to rebuild missing fragments
pub fn record_reconstruction() {
    counter!("ecstore_reconstructions_total").increment(1);
}
