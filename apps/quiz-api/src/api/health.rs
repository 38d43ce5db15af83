//! Health and readiness endpoints

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{SecondsFormat, Utc};
use database::DatabaseError;
use database::mongodb::{ConnectionStats, ReadyState, StatsReporter};
use serde::Serialize;
use std::time::Instant;
use utoipa::ToSchema;

/// Inputs for building health reports
#[derive(Clone, Debug)]
pub struct HealthState {
    stats: StatsReporter,
    started_at: Instant,
}

impl HealthState {
    /// `started_at` should be captured first thing in `main`.
    pub fn new(stats: StatsReporter, started_at: Instant) -> Self {
        Self { stats, started_at }
    }

    pub fn stats(&self) -> &StatsReporter {
        &self.stats
    }

    pub fn report(&self) -> Result<HealthReport, DatabaseError> {
        let connection_stats = self.stats.stats()?;

        Ok(HealthReport {
            status: "OK".to_string(),
            database: self.stats.ready_state().as_str().to_string(),
            uptime: self.started_at.elapsed().as_secs_f64(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            connection_stats,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    #[schema(example = "OK")]
    pub status: String,
    /// disconnected, connected, connecting or disconnecting
    #[schema(example = "connected")]
    pub database: String,
    /// Seconds since the process started
    pub uptime: f64,
    /// RFC 3339 UTC timestamp
    pub timestamp: String,
    /// readyState, host, port, name, poolSize, activeConnections
    #[schema(value_type = Object)]
    pub connection_stats: ConnectionStats,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthError {
    #[schema(example = "ERROR")]
    pub status: String,
    pub message: String,
    #[schema(example = "unknown")]
    pub database: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyReport {
    #[schema(example = "ready")]
    pub status: String,
    #[schema(example = "connected")]
    pub database: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .with_state(state)
}

/// Report process and database health
///
/// A disconnected database is reported with 200; only a failure to build the
/// report is a 500.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Health report", body = HealthReport),
        (status = 500, description = "Health report could not be built", body = HealthError)
    )
)]
pub async fn health(State(state): State<HealthState>) -> Response {
    match state.report() {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            tracing::error!("Health check error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthError {
                    status: "ERROR".to_string(),
                    message: e.to_string(),
                    database: "unknown".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Readiness probe: ready only while the database is connected
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Database connected", body = ReadyReport),
        (status = 503, description = "Database not connected", body = ReadyReport)
    )
)]
pub async fn ready(State(state): State<HealthState>) -> (StatusCode, Json<ReadyReport>) {
    let ready_state = state.stats.ready_state();
    let (status, label) = if ready_state == ReadyState::Connected {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    };

    (
        status,
        Json(ReadyReport {
            status: label.to_string(),
            database: ready_state.as_str().to_string(),
        }),
    )
}
