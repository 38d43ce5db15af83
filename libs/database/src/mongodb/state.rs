//! Observable connection state shared by the connection manager, the stats
//! reporter and anything that wants to react to connectivity changes.
//!
//! State lives in atomics so readers never block request handling. Observers
//! are registered with [`ConnectionState::subscribe`] and stay registered for
//! as long as the returned [`Subscription`] is alive.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::common::{DatabaseError, DatabaseResult};

/// Driver connection status.
///
/// The numeric codes are part of the stats payload clients already consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ReadyState {
    Disconnected = 0,
    Connected = 1,
    Connecting = 2,
    Disconnecting = 3,
}

impl ReadyState {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReadyState::Disconnected => "disconnected",
            ReadyState::Connected => "connected",
            ReadyState::Connecting => "connecting",
            ReadyState::Disconnecting => "disconnecting",
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            1 => ReadyState::Connected,
            2 => ReadyState::Connecting,
            3 => ReadyState::Disconnecting,
            _ => ReadyState::Disconnected,
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the pool points, resolved from the connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub database: String,
}

/// Notification delivered to observers on connectivity changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected { address: String },
    Error { address: Option<String>, message: String },
    Disconnected { address: Option<String> },
}

impl ConnectionEvent {
    /// Short label, used for logs and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectionEvent::Connected { .. } => "connected",
            ConnectionEvent::Error { .. } => "error",
            ConnectionEvent::Disconnected { .. } => "disconnected",
        }
    }
}

/// Driver-agnostic input to the state machine.
///
/// The connector translates SDAM/CMAP driver events into these. Readiness
/// follows the driver's topology view, so one unreachable replica-set member
/// does not take the handle down while another can still serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverSignal {
    /// A single server monitor failed; reported as an `error` event only.
    HeartbeatFailed { address: String, message: String },
    /// Whether any server satisfying the read preference is still selectable.
    TopologyChanged { available: bool },
    ConnectionCreated,
    ConnectionClosed,
    ConnectionCheckedOut,
    ConnectionCheckedIn,
}

type Observer = Arc<dyn Fn(&ConnectionEvent) + Send + Sync>;

/// Shared connection state.
pub struct ConnectionState {
    ready: AtomicU8,
    // Set once the initial connect succeeded; topology changes only promote after that.
    established: AtomicBool,
    close_requested: AtomicBool,
    open_connections: AtomicU32,
    checked_out: AtomicU32,
    endpoint: RwLock<Option<Endpoint>>,
    observers: RwLock<BTreeMap<u64, Observer>>,
    next_observer_id: AtomicU64,
}

impl ConnectionState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ready: AtomicU8::new(ReadyState::Disconnected.code()),
            established: AtomicBool::new(false),
            close_requested: AtomicBool::new(false),
            open_connections: AtomicU32::new(0),
            checked_out: AtomicU32::new(0),
            endpoint: RwLock::new(None),
            observers: RwLock::new(BTreeMap::new()),
            next_observer_id: AtomicU64::new(0),
        })
    }

    pub fn ready_state(&self) -> ReadyState {
        ReadyState::from_code(self.ready.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.ready_state() == ReadyState::Connected
    }

    pub fn endpoint(&self) -> DatabaseResult<Option<Endpoint>> {
        self.endpoint
            .read()
            .map(|endpoint| endpoint.clone())
            .map_err(|_| DatabaseError::StateUnavailable("endpoint lock poisoned".to_string()))
    }

    pub(crate) fn set_endpoint(&self, endpoint: Endpoint) {
        match self.endpoint.write() {
            Ok(mut guard) => *guard = Some(endpoint),
            Err(poisoned) => *poisoned.into_inner() = Some(endpoint),
        }
    }

    /// (open connections, checked-out connections)
    pub fn pool_counts(&self) -> (u32, u32) {
        (
            self.open_connections.load(Ordering::Relaxed),
            self.checked_out.load(Ordering::Relaxed),
        )
    }

    /// Register an observer for connectivity events.
    ///
    /// Observers run inline on the thread that delivered the driver event and
    /// must report only: no blocking, no panics. The observer is removed when
    /// the returned [`Subscription`] is dropped.
    pub fn subscribe<F>(self: &Arc<Self>, observer: F) -> Subscription
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        let id = self.next_observer_id.fetch_add(1, Ordering::Relaxed);
        match self.observers.write() {
            Ok(mut observers) => {
                observers.insert(id, Arc::new(observer));
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(id, Arc::new(observer));
            }
        }
        Subscription {
            id: Some(id),
            state: Arc::downgrade(self),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().map(|o| o.len()).unwrap_or(0)
    }

    fn unsubscribe(&self, id: u64) {
        match self.observers.write() {
            Ok(mut observers) => {
                observers.remove(&id);
            }
            Err(poisoned) => {
                poisoned.into_inner().remove(&id);
            }
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        // Clone out so observers may (un)subscribe without deadlocking.
        let observers: Vec<Observer> = match self.observers.read() {
            Ok(observers) => observers.values().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().values().cloned().collect(),
        };
        for observer in observers {
            observer(&event);
        }
    }

    fn transition(&self, from: &[ReadyState], to: ReadyState) -> bool {
        let mut current = self.ready.load(Ordering::Acquire);
        loop {
            if !from.contains(&ReadyState::from_code(current)) {
                return false;
            }
            match self.ready.compare_exchange(
                current,
                to.code(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    pub(crate) fn begin_connect(&self) -> bool {
        self.transition(&[ReadyState::Disconnected], ReadyState::Connecting)
    }

    pub(crate) fn connect_succeeded(&self, address: String) {
        self.established.store(true, Ordering::Release);
        if self.transition(
            &[ReadyState::Connecting, ReadyState::Disconnected],
            ReadyState::Connected,
        ) {
            self.emit(ConnectionEvent::Connected { address });
        }
    }

    pub(crate) fn connect_failed(&self, message: String) {
        self.ready
            .store(ReadyState::Disconnected.code(), Ordering::Release);
        self.emit(ConnectionEvent::Error {
            address: None,
            message,
        });
    }

    /// Mark the single close attempt. Fails if a close was already requested.
    pub(crate) fn begin_close(&self) -> DatabaseResult<()> {
        if self
            .close_requested
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DatabaseError::AlreadyClosing);
        }
        self.ready
            .store(ReadyState::Disconnecting.code(), Ordering::Release);
        Ok(())
    }

    pub(crate) fn finish_close(&self) {
        self.ready
            .store(ReadyState::Disconnected.code(), Ordering::Release);
        self.open_connections.store(0, Ordering::Relaxed);
        self.checked_out.store(0, Ordering::Relaxed);
        self.emit(ConnectionEvent::Disconnected {
            address: self.endpoint_address(),
        });
    }

    fn endpoint_address(&self) -> Option<String> {
        self.endpoint()
            .ok()
            .flatten()
            .map(|e| format!("{}:{}", e.host, e.port))
    }

    /// Feed a driver signal into the state machine.
    pub fn apply(&self, signal: DriverSignal) {
        match signal {
            DriverSignal::HeartbeatFailed { address, message } => {
                self.emit(ConnectionEvent::Error {
                    address: Some(address),
                    message,
                });
            }
            DriverSignal::TopologyChanged { available: true } => {
                let may_promote = self.established.load(Ordering::Acquire)
                    && !self.close_requested.load(Ordering::Acquire);
                if may_promote
                    && self.transition(&[ReadyState::Disconnected], ReadyState::Connected)
                {
                    self.emit(ConnectionEvent::Connected {
                        address: self.endpoint_address().unwrap_or_default(),
                    });
                }
            }
            DriverSignal::TopologyChanged { available: false } => {
                if self.transition(&[ReadyState::Connected], ReadyState::Disconnected) {
                    self.emit(ConnectionEvent::Disconnected {
                        address: self.endpoint_address(),
                    });
                }
            }
            DriverSignal::ConnectionCreated => {
                self.open_connections.fetch_add(1, Ordering::Relaxed);
            }
            DriverSignal::ConnectionClosed => saturating_decrement(&self.open_connections),
            DriverSignal::ConnectionCheckedOut => {
                self.checked_out.fetch_add(1, Ordering::Relaxed);
            }
            DriverSignal::ConnectionCheckedIn => saturating_decrement(&self.checked_out),
        }
    }
}

/// Hooks for driving the state without a server.
#[cfg(any(test, feature = "test-support"))]
impl ConnectionState {
    /// Record `endpoint` and move straight to `connected`.
    pub fn force_connected(&self, endpoint: Endpoint) {
        let address = format!("{}:{}", endpoint.host, endpoint.port);
        self.set_endpoint(endpoint);
        self.begin_connect();
        self.connect_succeeded(address);
    }

    /// Poison the endpoint lock so every later read fails.
    pub fn poison(&self) {
        let _ = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _guard = self.endpoint.write();
                    panic!("poisoning connection state");
                })
                .join()
        });
    }
}

impl fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, checked_out) = self.pool_counts();
        f.debug_struct("ConnectionState")
            .field("ready_state", &self.ready_state())
            .field("open_connections", &open)
            .field("checked_out", &checked_out)
            .field("observers", &self.observer_count())
            .finish()
    }
}

fn saturating_decrement(counter: &AtomicU32) {
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
}

/// Deregistration handle returned by [`ConnectionState::subscribe`].
#[must_use = "dropping a Subscription immediately removes the observer"]
pub struct Subscription {
    id: Option<u64>,
    state: Weak<ConnectionState>,
}

impl Subscription {
    /// Keep the observer registered for the rest of the state's lifetime.
    pub fn detach(mut self) {
        self.id = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let (Some(id), Some(state)) = (self.id, self.state.upgrade()) {
            state.unsubscribe(id);
        }
    }
}
