//! Database library for the quiz API: a single pooled MongoDB connection with
//! observable state and stats.
//!
//! # Features
//!
//! - `config` (default) - Load [`mongodb::ConnectionConfig`] with `core_config::FromEnv`
//!
//! # Example
//!
//! ```ignore
//! use core_config::FromEnv;
//! use database::mongodb::{ConnectionConfig, ConnectionManager, StatsReporter};
//!
//! let manager = ConnectionManager::new(ConnectionConfig::from_env()?);
//! let stats = StatsReporter::new(manager.state());
//! let connection = manager.connect().await?;
//!
//! stats.log_stats();
//! connection.close(std::time::Duration::from_secs(10)).await?;
//! ```

pub mod common;
pub mod mongodb;

pub use common::{DatabaseError, DatabaseResult};
