//! One-shot MongoDB connectivity check used by the `check_connection` binary.

use database::DatabaseResult;
use database::mongodb::{ConnectionConfig, ConnectionManager};
use std::time::Duration;
use tracing::{info, warn};

/// What a successful check saw on the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityReport {
    pub database: String,
    pub collections: Vec<String>,
}

/// Connect, list the collections of the configured database, then close.
///
/// The connection is closed whether or not the listing succeeds.
pub async fn check_connection(
    config: ConnectionConfig,
    close_timeout: Duration,
) -> DatabaseResult<ConnectivityReport> {
    let connection = ConnectionManager::new(config).connect().await?;
    let database = connection.database().name().to_string();

    let listed = connection.database().list_collection_names().await;

    if let Err(e) = connection.close(close_timeout).await {
        warn!("Closing the check connection failed: {}", e);
    }

    let mut collections = listed?;
    collections.sort();
    info!(database = %database, count = collections.len(), "Listed collections");

    Ok(ConnectivityReport {
        database,
        collections,
    })
}
