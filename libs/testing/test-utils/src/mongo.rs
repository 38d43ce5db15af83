//! MongoDB test infrastructure
//!
//! Provides a `TestMongo` helper that creates a MongoDB container for testing.

use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::mongo::Mongo;

const MONGO_PORT: u16 = 27017;

/// Test MongoDB wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
pub struct TestMongo {
    #[allow(dead_code)]
    container: ContainerAsync<Mongo>,
    host_port: u16,
}

impl TestMongo {
    /// Start a standalone MongoDB 7 container
    pub async fn new() -> Self {
        let container = Mongo::default()
            .with_tag("7")
            .start()
            .await
            .expect("Failed to start MongoDB container");

        let host_port = container
            .get_host_port_ipv4(MONGO_PORT)
            .await
            .expect("Failed to get MongoDB port");

        tracing::info!(port = host_port, "Test MongoDB ready (mongo:7)");

        Self {
            container,
            host_port,
        }
    }

    pub fn port(&self) -> u16 {
        self.host_port
    }

    /// Connection string without a default database
    pub fn uri(&self) -> String {
        format!("mongodb://127.0.0.1:{}", self.host_port)
    }

    /// Connection string selecting `database`
    pub fn uri_for(&self, database: &str) -> String {
        format!("{}/{}", self.uri(), database)
    }
}

impl Drop for TestMongo {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test MongoDB container");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_mongo_container_exposes_port() {
        let mongo = TestMongo::new().await;
        assert!(mongo.port() > 0);
        assert!(mongo.uri_for("quiz").ends_with("/quiz"));
    }
}
