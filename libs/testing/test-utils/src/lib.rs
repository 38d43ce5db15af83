//! Shared test utilities
//!
//! - `TestMongo`: MongoDB container with automatic cleanup
//!
//! # Usage
//!
//! ```rust,ignore
//! use test_utils::TestMongo;
//!
//! #[tokio::test]
//! #[ignore = "requires Docker"]
//! async fn my_mongo_test() {
//!     let mongo = TestMongo::new().await;
//!     let uri = mongo.uri_for("quiz");
//! }
//! ```

mod mongo;

pub use mongo::TestMongo;
