//! # Axum Helpers
//!
//! Shared building blocks for the quiz API's HTTP layer.
//!
//! ## Modules
//!
//! - **[`auth`]**: Stateless JWT authentication for protected routers
//! - **[`server`]**: Router assembly, graceful shutdown with a bounded drain
//! - **[`http`]**: HTTP middleware (CORS, security headers)
//! - **[`errors`]**: Structured error responses with error codes
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum::Router;
//! use axum_helpers::{CorsConfig, ShutdownCoordinator, create_cors_layer, create_production_app, create_router};
//! use core_config::server::ServerConfig;
//! use utoipa::OpenApi;
//!
//! #[derive(OpenApi)]
//! #[openapi(paths())]
//! struct ApiDoc;
//!
//! let router = create_router::<ApiDoc>(Router::new(), Router::new(), create_cors_layer(&CorsConfig::default())?);
//! let cleanup = async { Ok::<(), std::io::Error>(()) };
//! create_production_app(router, &ServerConfig::default(), ShutdownCoordinator::new(), timeout, cleanup).await?;
//! ```

pub mod auth;
pub mod errors;
pub mod http;
pub mod server;

// Re-export auth types
pub use auth::{ACCESS_TOKEN_TTL, JwtAuth, JwtClaims, JwtConfig, jwt_auth_middleware};

// Re-export server types
pub use server::{
    DrainOutcome, ShutdownCoordinator, ShutdownPhase, create_production_app, create_router,
};

// Re-export HTTP middleware
pub use http::{CorsConfig, DEFAULT_ALLOWED_ORIGINS, create_cors_layer, security_headers};

// Re-export error types
pub use errors::{AppError, ErrorCode, ErrorResponse};
