use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::state::{ConnectionState, ReadyState};
use crate::common::DatabaseResult;

/// Pool figure that is only meaningful once the pool is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolValue {
    Count(u32),
    Unavailable,
}

impl Serialize for PoolValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PoolValue::Count(n) => serializer.serialize_u32(*n),
            PoolValue::Unavailable => serializer.serialize_str("N/A"),
        }
    }
}

/// Point-in-time view of the connection, recomputed on every call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    pub ready_state: u8,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub name: Option<String>,
    pub pool_size: PoolValue,
    pub active_connections: PoolValue,
}

/// Reads connection stats without touching the network.
#[derive(Debug, Clone)]
pub struct StatsReporter {
    state: Arc<ConnectionState>,
}

impl StatsReporter {
    pub fn new(state: Arc<ConnectionState>) -> Self {
        Self { state }
    }

    pub fn ready_state(&self) -> ReadyState {
        self.state.ready_state()
    }

    /// Snapshot the current state. Pool figures read as unavailable until connected.
    pub fn stats(&self) -> DatabaseResult<ConnectionStats> {
        let ready_state = self.state.ready_state();
        let endpoint = self.state.endpoint()?;

        let (pool_size, active_connections) = if ready_state == ReadyState::Connected {
            let (open, checked_out) = self.state.pool_counts();
            (PoolValue::Count(open), PoolValue::Count(checked_out))
        } else {
            (PoolValue::Unavailable, PoolValue::Unavailable)
        };

        Ok(ConnectionStats {
            ready_state: ready_state.code(),
            host: endpoint.as_ref().map(|e| e.host.clone()),
            port: endpoint.as_ref().map(|e| e.port),
            name: endpoint.map(|e| e.database),
            pool_size,
            active_connections,
        })
    }

    pub fn log_stats(&self) {
        match self.stats() {
            Ok(stats) => info!(
                ready_state = stats.ready_state,
                host = stats.host.as_deref(),
                port = stats.port,
                name = stats.name.as_deref(),
                pool_size = ?stats.pool_size,
                active_connections = ?stats.active_connections,
                "MongoDB connection stats"
            ),
            Err(e) => warn!("Failed to read MongoDB connection stats: {}", e),
        }
    }

    /// Log stats every `interval` until `shutdown` fires or its sender is dropped.
    pub fn spawn_monitor(
        self,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => self.log_stats(),
                    _ = shutdown.recv() => {
                        debug!("Stopping MongoDB stats monitor");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mongodb::state::{DriverSignal, Endpoint};

    fn state_with_endpoint() -> Arc<ConnectionState> {
        let state = ConnectionState::new();
        state.set_endpoint(Endpoint {
            host: "db.local".to_string(),
            port: 27017,
            database: "quiz".to_string(),
        });
        state
    }

    #[test]
    fn test_stats_before_connect_use_sentinels() {
        let reporter = StatsReporter::new(ConnectionState::new());
        let stats = reporter.stats().unwrap();

        assert_eq!(stats.ready_state, 0);
        assert!(stats.host.is_none());
        assert_eq!(stats.pool_size, PoolValue::Unavailable);
        assert_eq!(stats.active_connections, PoolValue::Unavailable);
    }

    #[test]
    fn test_stats_serialize_with_all_fields() {
        let reporter = StatsReporter::new(state_with_endpoint());
        let json = serde_json::to_value(reporter.stats().unwrap()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "readyState": 0,
                "host": "db.local",
                "port": 27017,
                "name": "quiz",
                "poolSize": "N/A",
                "activeConnections": "N/A",
            })
        );
    }

    #[test]
    fn test_stats_report_pool_counts_when_connected() {
        let state = state_with_endpoint();
        state.begin_connect();
        state.connect_succeeded("db.local:27017".to_string());
        state.apply(DriverSignal::ConnectionCreated);
        state.apply(DriverSignal::ConnectionCreated);
        state.apply(DriverSignal::ConnectionCheckedOut);

        let stats = StatsReporter::new(state).stats().unwrap();
        assert_eq!(stats.ready_state, 1);
        assert_eq!(stats.pool_size, PoolValue::Count(2));
        assert_eq!(stats.active_connections, PoolValue::Count(1));
    }

    #[test]
    fn test_log_stats_does_not_panic_when_disconnected() {
        StatsReporter::new(ConnectionState::new()).log_stats();
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_stops_on_shutdown() {
        let (tx, rx) = broadcast::channel(1);
        let handle = StatsReporter::new(state_with_endpoint())
            .spawn_monitor(Duration::from_secs(60), rx);

        tokio::time::advance(Duration::from_secs(150)).await;
        tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor should stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_monitor_stops_when_sender_dropped() {
        let (tx, rx) = broadcast::channel::<()>(1);
        let handle = StatsReporter::new(ConnectionState::new())
            .spawn_monitor(Duration::from_secs(3600), rx);
        drop(tx);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor should stop")
            .unwrap();
    }
}
