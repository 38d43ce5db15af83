//! Verify MongoDB connectivity and list the collections of the configured database
//!
//! Run with: MONGO_URI=mongodb://localhost:27017/quiz cargo run -p quiz_api --bin check_connection

use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, FromEnv};
use database::mongodb::ConnectionConfig;
use quiz_api::connectivity::check_connection;
use std::time::Duration;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();
    init_tracing(&Environment::from_env());

    let config = ConnectionConfig::from_env()?;
    println!("Connecting to MongoDB at {}", config.redacted_uri());

    let report = check_connection(config, Duration::from_secs(5)).await?;

    println!("Connected to database '{}'", report.database);
    println!("Collections ({}):", report.collections.len());
    for name in &report.collections {
        println!("  - {}", name);
    }

    Ok(())
}
