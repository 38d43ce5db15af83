//! Prometheus scrape endpoint

use axum::{Router, extract::State, routing::get};
use observability::{DatabaseMetrics, render_metrics};

use super::health::HealthState;

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Pool gauges are refreshed on every scrape.
async fn metrics(State(state): State<HealthState>) -> String {
    match state.stats().stats() {
        Ok(stats) => DatabaseMetrics::record_stats(&stats),
        Err(e) => tracing::warn!("Skipping MongoDB gauges: {}", e),
    }
    render_metrics()
}
