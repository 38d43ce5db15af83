//! MongoDB connection metrics.

use database::mongodb::{ConnectionState, ConnectionStats, PoolValue, Subscription};
use metrics::{counter, gauge};
use std::sync::Arc;

/// MongoDB metrics recorder
pub struct DatabaseMetrics;

impl DatabaseMetrics {
    /// Count connectivity events for as long as the subscription lives.
    pub fn observe(state: &Arc<ConnectionState>) -> Subscription {
        state.subscribe(|event| {
            counter!("mongodb_connection_events_total", "event" => event.kind()).increment(1);
        })
    }

    /// Publish a stats snapshot as gauges. Unavailable pool figures are skipped.
    pub fn record_stats(stats: &ConnectionStats) {
        gauge!("mongodb_ready_state").set(f64::from(stats.ready_state));

        if let PoolValue::Count(open) = stats.pool_size {
            gauge!("mongodb_pool_connections").set(f64::from(open));
        }
        if let PoolValue::Count(checked_out) = stats.active_connections {
            gauge!("mongodb_pool_checked_out").set(f64::from(checked_out));
        }
    }
}
