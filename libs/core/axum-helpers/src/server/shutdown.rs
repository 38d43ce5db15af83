use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Lifecycle of the process as seen by shutdown handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShutdownPhase {
    Running = 0,
    Draining = 1,
    Terminated = 2,
}

impl ShutdownPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ShutdownPhase::Running,
            1 => ShutdownPhase::Draining,
            _ => ShutdownPhase::Terminated,
        }
    }
}

/// Result of running cleanup during drain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    Completed,
    Failed(String),
    TimedOut(Duration),
}

/// Shutdown coordinator that manages graceful application shutdown.
///
/// - Signal reception (SIGTERM, SIGINT), both handled the same way
/// - Broadcasting shutdown to background tasks
/// - A single bounded drain of external resources
///
/// Clones share state. Only the first [`shutdown`](Self::shutdown) call has
/// any effect, so repeated or concurrent signals cannot start a second drain.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    tx: broadcast::Sender<()>,
    phase: Arc<AtomicU8>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            phase: Arc::new(AtomicU8::new(ShutdownPhase::Running as u8)),
        }
    }

    /// Subscribe to shutdown notifications.
    ///
    /// Subscribers created after shutdown started miss the broadcast; check
    /// [`is_shutting_down`](Self::is_shutting_down) first if that matters.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn phase(&self) -> ShutdownPhase {
        ShutdownPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn is_shutting_down(&self) -> bool {
        self.phase() != ShutdownPhase::Running
    }

    /// Move to draining and notify subscribers. Returns false if shutdown was
    /// already under way.
    pub fn shutdown(&self) -> bool {
        let started = self
            .phase
            .compare_exchange(
                ShutdownPhase::Running as u8,
                ShutdownPhase::Draining as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();

        if started {
            info!("Initiating graceful shutdown");
            let _ = self.tx.send(());
        } else {
            info!("Shutdown already in progress");
        }
        started
    }

    /// Resolves once shutdown has been requested, by signal or by [`shutdown`](Self::shutdown).
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.subscribe();
        if self.is_shutting_down() {
            return;
        }
        let _ = rx.recv().await;
    }

    /// Wait for SIGINT or SIGTERM, then start shutdown.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
            },
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown");
            },
            _ = self.wait_for_shutdown() => return,
        }

        self.shutdown();
    }

    /// Run `cleanup` once, bounded by `timeout`.
    ///
    /// Failures and timeouts are logged and reported, never propagated: the
    /// process proceeds to exit either way.
    pub async fn drain<F, E>(&self, cleanup: F, timeout: Duration) -> DrainOutcome
    where
        F: Future<Output = Result<(), E>>,
        E: Display,
    {
        self.shutdown();
        info!("Starting cleanup tasks (timeout: {:?})", timeout);

        match tokio::time::timeout(timeout, cleanup).await {
            Ok(Ok(())) => {
                info!("Cleanup completed successfully");
                DrainOutcome::Completed
            }
            Ok(Err(e)) => {
                error!("Cleanup failed: {}", e);
                DrainOutcome::Failed(e.to_string())
            }
            Err(_) => {
                warn!("Cleanup exceeded timeout of {:?}, forcing shutdown", timeout);
                DrainOutcome::TimedOut(timeout)
            }
        }
    }

    pub fn mark_terminated(&self) {
        self.phase
            .store(ShutdownPhase::Terminated as u8, Ordering::Release);
        info!("Shutdown complete");
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
