//! Server infrastructure module.
//!
//! - Router assembly with OpenAPI documentation and shared middleware
//! - Graceful shutdown coordination with a bounded drain
//!
//! # Example
//!
//! ```ignore
//! use axum_helpers::server::{ShutdownCoordinator, create_production_app, create_router};
//!
//! let router = create_router::<ApiDoc>(root, apis, cors);
//! let outcome = create_production_app(router, &server, ShutdownCoordinator::new(), timeout, cleanup).await?;
//! ```

pub mod app;
pub mod shutdown;

pub use app::{create_production_app, create_router};
pub use shutdown::{DrainOutcome, ShutdownCoordinator, ShutdownPhase};
