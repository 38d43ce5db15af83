//! Quiz API backend
//!
//! Serves topic question sets from a JSON file, reports process and MongoDB
//! health, and shuts down cleanly on SIGINT/SIGTERM.

pub mod api;
pub mod config;
pub mod connectivity;
pub mod openapi;
pub mod questions;
pub mod startup;
pub mod state;

pub use api::FeatureRouters;
pub use config::Config;
pub use startup::{Application, StartupError};
pub use state::AppState;
