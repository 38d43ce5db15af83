//! Shared application state.
//!
//! Cloned into every router; all fields are cheap `Arc`-backed clones.

use axum_helpers::JwtAuth;
use database::mongodb::StatsReporter;
use std::sync::Arc;
use std::time::Instant;

use crate::api::health::HealthState;
use crate::questions::QuestionBank;

#[derive(Clone)]
pub struct AppState {
    /// Topic question sets, loaded once at startup
    pub questions: Arc<QuestionBank>,
    pub health: HealthState,
    /// Token verification for the protected feature routers
    pub jwt: JwtAuth,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        questions: QuestionBank,
        stats: StatsReporter,
        started_at: Instant,
        jwt: JwtAuth,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            questions: Arc::new(questions),
            health: HealthState::new(stats, started_at),
            jwt,
            max_upload_bytes,
        }
    }
}
