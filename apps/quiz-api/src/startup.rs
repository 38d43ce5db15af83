//! Startup validation and the server run loop.
//!
//! Everything that can make the process refuse to start (configuration,
//! question data, CORS origins, the metrics recorder, the initial MongoDB
//! connection) is checked in [`Application::build`] before the listener binds.

use axum::Router;
use axum_helpers::{DrainOutcome, JwtAuth, ShutdownCoordinator, create_cors_layer};
use core_config::{ConfigError, FromEnv};
use database::DatabaseError;
use database::mongodb::{ConnectionManager, MongoConnection, StatsReporter};
use observability::{DatabaseMetrics, init_metrics};
use std::time::{Duration, Instant};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::api::{self, FeatureRouters};
use crate::config::Config;
use crate::questions::{QuestionBank, QuestionsError};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Questions(#[from] QuestionsError),

    #[error("Failed to install metrics recorder: {0}")]
    Metrics(String),

    #[error("MongoDB connection failed: {0}")]
    Database(#[from] DatabaseError),
}

/// A validated, connected application that has not started serving yet
pub struct Application {
    config: Config,
    state: AppState,
    cors: CorsLayer,
    connection: MongoConnection,
}

impl Application {
    /// `started_at` is the process start, reported as health uptime.
    pub async fn from_env(started_at: Instant) -> Result<Self, StartupError> {
        Self::build(Config::from_env()?, started_at).await
    }

    pub async fn build(config: Config, started_at: Instant) -> Result<Self, StartupError> {
        let questions = QuestionBank::load(&config.questions_path)?;
        let cors = create_cors_layer(&config.cors)?;
        init_metrics().map_err(|e| StartupError::Metrics(e.to_string()))?;

        info!("Connecting to MongoDB at {}", config.mongodb.redacted_uri());
        let manager = ConnectionManager::new(config.mongodb.clone());
        DatabaseMetrics::observe(&manager.state()).detach();
        let stats = StatsReporter::new(manager.state());
        let connection = manager.connect().await?;

        let state = AppState::new(
            questions,
            stats,
            started_at,
            JwtAuth::new(&config.jwt),
            config.max_upload_bytes,
        );

        Ok(Self {
            config,
            state,
            cors,
            connection,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn connection(&self) -> &MongoConnection {
        &self.connection
    }

    pub fn router(&self, features: FeatureRouters) -> Router {
        api::app(&self.state, self.cors.clone(), features)
    }

    /// Serve until SIGINT/SIGTERM, then close the MongoDB connection once.
    ///
    /// A failed or slow close is reported in the returned outcome; only
    /// bind and serve failures are errors.
    pub async fn run(self, features: FeatureRouters) -> std::io::Result<DrainOutcome> {
        let router = self.router(features);
        let coordinator = ShutdownCoordinator::new();
        let shutdown_timeout = self.config.shutdown_timeout;
        let close_timeout = close_budget(shutdown_timeout);

        let monitor = self.config.monitor_interval.map(|interval| {
            info!("Logging MongoDB stats every {:?}", interval);
            self.state
                .health
                .stats()
                .clone()
                .spawn_monitor(interval, coordinator.subscribe())
        });

        info!(
            "Starting {} v{} ({})",
            self.config.app.name,
            self.config.app.version,
            self.config.environment.as_str()
        );

        let connection = self.connection;
        let outcome = axum_helpers::create_production_app(
            router,
            &self.config.server,
            coordinator,
            shutdown_timeout,
            async move {
                info!("Closing MongoDB connection");
                connection.close(close_timeout).await
            },
        )
        .await?;

        if let Some(monitor) = monitor {
            monitor.abort();
        }

        Ok(outcome)
    }
}

/// Time allowed for closing MongoDB. Stays strictly below the drain budget so
/// a hung driver surfaces as `CloseTimedOut` rather than a drain timeout.
fn close_budget(shutdown_timeout: Duration) -> Duration {
    shutdown_timeout * 4 / 5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_budget_fits_inside_drain() {
        for secs in [1, 10, 30] {
            let drain = Duration::from_secs(secs);
            assert!(close_budget(drain) < drain);
        }
        assert_eq!(close_budget(Duration::from_secs(10)), Duration::from_secs(8));
    }
}
