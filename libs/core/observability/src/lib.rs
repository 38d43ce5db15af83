//! Observability utilities for the quiz API.
//!
//! - Prometheus recorder installation and export
//! - MongoDB connection and pool metrics
//! - Axum middleware for request metrics
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{DatabaseMetrics, init_metrics, render_metrics};
//!
//! init_metrics()?;
//! DatabaseMetrics::observe(&connection.state()).detach();
//!
//! let app = Router::new().route("/metrics", get(|| async { render_metrics() }));
//! ```

pub mod database;
pub mod middleware;

pub use database::DatabaseMetrics;
pub use middleware::metrics_middleware;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Later calls return the same handle.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;
        info!("Prometheus metrics recorder initialized");
        register_metric_descriptions();
        Ok(handle)
    })
}

/// Get the metrics handle (must call init_metrics first)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Prometheus text exposition of everything recorded so far
pub fn render_metrics() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

fn register_metric_descriptions() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // HTTP metrics
    describe_counter!("http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_requests_errors_total",
        "Total number of HTTP request errors"
    );

    // MongoDB metrics
    describe_gauge!(
        "mongodb_ready_state",
        "Driver ready state: 0 disconnected, 1 connected, 2 connecting, 3 disconnecting"
    );
    describe_gauge!(
        "mongodb_pool_connections",
        "Open connections in the MongoDB pool"
    );
    describe_gauge!(
        "mongodb_pool_checked_out",
        "MongoDB connections currently checked out"
    );
    describe_counter!(
        "mongodb_connection_events_total",
        "MongoDB connectivity events by kind"
    );
}
