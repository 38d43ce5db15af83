use mongodb::bson::doc;
use mongodb::event::EventHandler;
use mongodb::event::cmap::CmapEvent;
use mongodb::event::sdam::SdamEvent;
use mongodb::options::{ClientOptions, SelectionCriteria, ServerAddress};
use mongodb::{Client, Database};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::ConnectionConfig;
use super::state::{ConnectionEvent, ConnectionState, DriverSignal, Endpoint, ReadyState};
use crate::common::{DatabaseError, DatabaseResult};

const DEFAULT_PORT: u16 = 27017;
const FALLBACK_DATABASE: &str = "test";

/// Opens the process' single pooled MongoDB connection.
///
/// `connect` consumes the manager, so a second connect on the same pool
/// cannot be expressed. The shared [`ConnectionState`] is available before
/// connecting so health and stats can be wired up front.
///
/// # Example
/// ```ignore
/// use database::mongodb::{ConnectionConfig, ConnectionManager};
///
/// let manager = ConnectionManager::new(ConnectionConfig::new("mongodb://localhost:27017/quiz"));
/// let connection = manager.connect().await?;
/// let questions = connection.database().collection::<Document>("questions");
/// ```
pub struct ConnectionManager {
    config: ConnectionConfig,
    state: Arc<ConnectionState>,
}

impl ConnectionManager {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            state: ConnectionState::new(),
        }
    }

    pub fn state(&self) -> Arc<ConnectionState> {
        self.state.clone()
    }

    /// Negotiate the connection and verify it with a `ping`.
    ///
    /// Either returns a connected handle or an error; no retry happens here,
    /// retries are left to the driver's `retryWrites`/`retryReads`.
    pub async fn connect(self) -> DatabaseResult<MongoConnection> {
        let Self { config, state } = self;

        if !state.begin_connect() {
            return Err(DatabaseError::ConnectionFailed(format!(
                "connection is already {}",
                state.ready_state()
            )));
        }

        info!(uri = %config.redacted_uri(), "Connecting to MongoDB");

        match establish(&config, &state).await {
            Ok((client, database, endpoint)) => {
                let address = format!("{}:{}", endpoint.host, endpoint.port);
                info!("MongoDB Connected: {}", endpoint.host);
                info!("Connection pool size: {}", config.max_pool_size);

                register_logging_observers(&state);
                state.connect_succeeded(address);

                Ok(MongoConnection {
                    client,
                    database,
                    state,
                    config: Arc::new(config),
                })
            }
            Err(e) => {
                error!("Error connecting to MongoDB: {}", e);
                state.connect_failed(e.to_string());
                Err(match e {
                    DatabaseError::ConnectionFailed(_) => e,
                    other => DatabaseError::ConnectionFailed(other.to_string()),
                })
            }
        }
    }
}

async fn establish(
    config: &ConnectionConfig,
    state: &Arc<ConnectionState>,
) -> DatabaseResult<(Client, Database, Endpoint)> {
    config.validate().map_err(DatabaseError::ConfigError)?;

    let mut options = ClientOptions::parse(&config.uri).await?;
    config.apply_to(&mut options);

    let endpoint = resolve_endpoint(&options);
    state.set_endpoint(endpoint.clone());
    let criteria = SelectionCriteria::ReadPreference(config.read_preference.into());
    install_event_handlers(&mut options, state, criteria);

    let client = Client::with_options(options)?;
    let database = client.database(&endpoint.database);

    let admin = client.database("admin");
    let ping = admin.run_command(doc! { "ping": 1 });
    match tokio::time::timeout(config.socket_timeout, ping).await {
        Ok(result) => {
            result?;
        }
        Err(_) => {
            return Err(DatabaseError::ConnectionFailed(format!(
                "ping did not complete within {:?}",
                config.socket_timeout
            )));
        }
    }

    Ok((client, database, endpoint))
}

fn resolve_endpoint(options: &ClientOptions) -> Endpoint {
    let (host, port) = match options.hosts.first() {
        Some(ServerAddress::Tcp { host, port, .. }) => (host.clone(), port.unwrap_or(DEFAULT_PORT)),
        Some(other) => (other.to_string(), DEFAULT_PORT),
        None => ("localhost".to_string(), DEFAULT_PORT),
    };
    let database = options
        .default_database
        .clone()
        .unwrap_or_else(|| FALLBACK_DATABASE.to_string());

    Endpoint {
        host,
        port,
        database,
    }
}

fn install_event_handlers(
    options: &mut ClientOptions,
    state: &Arc<ConnectionState>,
    criteria: SelectionCriteria,
) {
    let sdam_state = state.clone();
    options.sdam_event_handler = Some(EventHandler::callback(move |event: SdamEvent| {
        let signal = match event {
            SdamEvent::TopologyDescriptionChanged(e) => DriverSignal::TopologyChanged {
                available: e
                    .new_description
                    .has_readable_server(Some(criteria.clone())),
            },
            SdamEvent::ServerHeartbeatFailed(e) => DriverSignal::HeartbeatFailed {
                address: e.server_address.to_string(),
                message: e.failure.to_string(),
            },
            _ => return,
        };
        sdam_state.apply(signal);
    }));

    let cmap_state = state.clone();
    options.cmap_event_handler = Some(EventHandler::callback(move |event: CmapEvent| {
        let signal = match event {
            CmapEvent::ConnectionCreated(_) => DriverSignal::ConnectionCreated,
            CmapEvent::ConnectionClosed(_) => DriverSignal::ConnectionClosed,
            CmapEvent::ConnectionCheckedOut(_) => DriverSignal::ConnectionCheckedOut,
            CmapEvent::ConnectionCheckedIn(_) => DriverSignal::ConnectionCheckedIn,
            _ => return,
        };
        cmap_state.apply(signal);
    }));
}

/// Log every connectivity change for the lifetime of the process.
fn register_logging_observers(state: &Arc<ConnectionState>) {
    state
        .subscribe(|event| {
            if let ConnectionEvent::Connected { address } = event {
                info!(%address, "MongoDB connected");
            }
        })
        .detach();
    state
        .subscribe(|event| {
            if let ConnectionEvent::Error { address, message } = event {
                error!(address = address.as_deref(), "MongoDB connection error: {}", message);
            }
        })
        .detach();
    state
        .subscribe(|event| {
            if let ConnectionEvent::Disconnected { address } = event {
                warn!(address = address.as_deref(), "MongoDB disconnected");
            }
        })
        .detach();
}

/// Live pooled connection. Clones share the same pool and state.
#[derive(Clone)]
pub struct MongoConnection {
    client: Client,
    database: Database,
    state: Arc<ConnectionState>,
    config: Arc<ConnectionConfig>,
}

impl MongoConnection {
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Database named by the configuration or the connection string
    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn state(&self) -> Arc<ConnectionState> {
        self.state.clone()
    }

    pub fn ready_state(&self) -> ReadyState {
        self.state.ready_state()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Close the pool, waiting at most `timeout` for the driver to drain.
    ///
    /// Only the first call on any clone does work; later calls return
    /// [`DatabaseError::AlreadyClosing`]. The state reaches `disconnected`
    /// even if the caller stops polling this future before it completes.
    pub async fn close(&self, timeout: Duration) -> DatabaseResult<()> {
        bounded_close(&self.state, timeout, self.client.clone().shutdown()).await
    }
}

async fn bounded_close<F>(
    state: &Arc<ConnectionState>,
    timeout: Duration,
    shutdown: F,
) -> DatabaseResult<()>
where
    F: IntoFuture<Output = ()>,
{
    state.begin_close()?;
    let _finish = CloseGuard(state.clone());
    info!("Closing MongoDB connection");

    match tokio::time::timeout(timeout, shutdown).await {
        Ok(()) => {
            info!("MongoDB connection closed");
            Ok(())
        }
        Err(_) => Err(DatabaseError::CloseTimedOut(timeout)),
    }
}

/// Completes the `disconnecting` → `disconnected` transition on drop.
struct CloseGuard(Arc<ConnectionState>);

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.0.finish_close();
    }
}

impl std::fmt::Debug for MongoConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoConnection")
            .field("database", &self.database.name())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    async fn parsed(uri: &str) -> ClientOptions {
        ClientOptions::parse(uri).await.unwrap()
    }

    #[tokio::test]
    async fn test_resolve_endpoint_from_uri() {
        let options = parsed("mongodb://db.internal:27018/prep").await;
        let endpoint = resolve_endpoint(&options);
        assert_eq!(endpoint.host, "db.internal");
        assert_eq!(endpoint.port, 27018);
        assert_eq!(endpoint.database, "prep");
    }

    #[tokio::test]
    async fn test_resolve_endpoint_defaults() {
        let options = parsed("mongodb://localhost").await;
        let endpoint = resolve_endpoint(&options);
        assert_eq!(endpoint.port, DEFAULT_PORT);
        assert_eq!(endpoint.database, FALLBACK_DATABASE);
    }

    #[tokio::test]
    async fn test_database_override_wins_over_uri() {
        let config = ConnectionConfig::new("mongodb://localhost:27017/prep").with_database("quiz");
        let mut options = parsed(&config.uri).await;
        config.apply_to(&mut options);
        assert_eq!(resolve_endpoint(&options).database, "quiz");
    }

    #[tokio::test]
    async fn test_state_is_available_before_connect() {
        let manager = ConnectionManager::new(ConnectionConfig::new("mongodb://localhost:27017"));
        let state = manager.state();
        assert_eq!(state.ready_state(), ReadyState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_fails_fast_on_unreachable_host() {
        let config = ConnectionConfig::new("mongodb://127.0.0.1:1/quiz")
            .with_server_selection_timeout(Duration::from_millis(200));
        let manager = ConnectionManager::new(config);
        let state = manager.state();

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, DatabaseError::ConnectionFailed(_)));
        assert_eq!(state.ready_state(), ReadyState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_pool_bounds() {
        let config = ConnectionConfig::new("mongodb://localhost:27017").with_pool_size(1, 4);
        let err = ConnectionManager::new(config).connect().await.unwrap_err();
        assert!(err.to_string().contains("pool size"));
    }

    fn connected_state() -> Arc<ConnectionState> {
        let state = ConnectionState::new();
        state.begin_connect();
        state.connect_succeeded("db.local:27017".to_string());
        state
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_reports_timeout_and_disconnects() {
        let state = connected_state();
        let result =
            bounded_close(&state, Duration::from_secs(5), std::future::pending::<()>()).await;

        assert!(matches!(result, Err(DatabaseError::CloseTimedOut(_))));
        assert_eq!(state.ready_state(), ReadyState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_close_still_disconnects() {
        let state = connected_state();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let _sub = state.subscribe(move |event| sink.lock().unwrap().push(event.kind()));

        // Outer deadline fires before the close's own budget
        let close = bounded_close(&state, Duration::from_secs(10), std::future::pending::<()>());
        assert!(tokio::time::timeout(Duration::from_secs(5), close).await.is_err());

        assert_eq!(state.ready_state(), ReadyState::Disconnected);
        assert_eq!(*events.lock().unwrap(), vec!["disconnected"]);
        assert!(matches!(state.begin_close(), Err(DatabaseError::AlreadyClosing)));
    }

    #[tokio::test]
    async fn test_completed_close_disconnects_once() {
        let state = connected_state();
        bounded_close(&state, Duration::from_secs(1), async {}).await.unwrap();
        assert_eq!(state.ready_state(), ReadyState::Disconnected);

        let again = bounded_close(&state, Duration::from_secs(1), async {}).await;
        assert!(matches!(again, Err(DatabaseError::AlreadyClosing)));
        assert_eq!(state.ready_state(), ReadyState::Disconnected);
    }
}
