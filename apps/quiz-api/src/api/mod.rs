//! API routes module
//!
//! Root routes (liveness, health, metrics and the feature routers) are mounted
//! as-is; [`api_routes`] is nested under `/api` by `axum_helpers::create_router`.

pub mod health;
pub mod metrics;
pub mod questions;

use axum::{Router, extract::DefaultBodyLimit, middleware, routing::get};
use axum_helpers::{create_router, jwt_auth_middleware};
use observability::metrics_middleware;
use tower_http::cors::CorsLayer;

use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Routers owned by the auth, test, upload and progress features.
///
/// Each is mounted at `/<feature>` when present. `test` and `upload` sit
/// behind JWT authentication; `upload` also gets the request body limit.
#[derive(Default)]
pub struct FeatureRouters {
    pub auth: Option<Router>,
    pub test: Option<Router>,
    pub upload: Option<Router>,
    pub progress: Option<Router>,
}

/// Liveness message served at `/`
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses((status = 200, description = "API is running", body = String))
)]
pub async fn root() -> &'static str {
    "API is running..."
}

pub fn root_routes(state: &AppState, features: FeatureRouters) -> Router {
    let mut router = Router::new()
        .route("/", get(root))
        .merge(health::router(state.health.clone()))
        .merge(metrics::router(state.health.clone()));

    let jwt = middleware::from_fn_with_state(state.jwt.clone(), jwt_auth_middleware);

    if let Some(auth) = features.auth {
        router = router.nest("/auth", auth);
    }
    if let Some(test) = features.test {
        router = router.nest("/test", test.layer(jwt.clone()));
    }
    if let Some(upload) = features.upload {
        router = router.nest(
            "/upload",
            upload
                .layer(DefaultBodyLimit::max(state.max_upload_bytes))
                .layer(jwt),
        );
    }
    if let Some(progress) = features.progress {
        router = router.nest("/progress", progress);
    }

    router
}

/// Create all API routes
/// Note: These are nested under /api by axum_helpers::create_router
pub fn api_routes(state: &AppState) -> Router {
    questions::router(state.questions.clone())
}

/// Full application router: docs, root and `/api` routes, shared middleware.
pub fn app(state: &AppState, cors: CorsLayer, features: FeatureRouters) -> Router {
    create_router::<ApiDoc>(root_routes(state, features), api_routes(state), cors)
        .layer(middleware::from_fn(metrics_middleware))
}
