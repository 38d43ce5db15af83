//! MongoDB connection lifecycle
//!
//! [`ConnectionManager`] opens the pool, [`ConnectionState`] tracks it and
//! notifies observers, [`StatsReporter`] turns it into [`ConnectionStats`].

mod config;
mod connector;
mod state;
mod stats;

pub use config::{Compression, ConnectionConfig, ReadPreferenceMode, WriteConcernLevel};
pub use connector::{ConnectionManager, MongoConnection};
pub use state::{ConnectionEvent, ConnectionState, DriverSignal, Endpoint, ReadyState, Subscription};
pub use stats::{ConnectionStats, PoolValue, StatsReporter};

// Re-export MongoDB types for convenience
pub use mongodb::{Client, Collection, Database, bson};
