use super::shutdown::{DrainOutcome, ShutdownCoordinator};
use crate::errors::handlers::not_found;
use crate::http::security::security_headers;
use axum::{Router, middleware};
use core_config::server::ServerConfig;
use std::fmt::Display;
use std::future::{Future, IntoFuture};
use std::io;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Creates a configured Axum router with common middleware and documentation.
///
/// - `root` is mounted as-is (liveness, health, metrics)
/// - `apis` is nested under `/api`
/// - Swagger UI at `/swagger-ui`, OpenAPI document at `/api-docs/openapi.json`
/// - Tracing, security headers, CORS and compression on every route
/// - JSON 404 fallback
///
/// Both routers must already have their state applied.
///
/// # Example
/// ```ignore
/// use axum_helpers::{CorsConfig, create_cors_layer, server::create_router};
///
/// let router = create_router::<ApiDoc>(
///     Router::new().route("/health", get(health)),
///     Router::new().route("/questions/{topicName}", get(topic)),
///     create_cors_layer(&CorsConfig::default())?,
/// );
/// ```
pub fn create_router<T>(root: Router, apis: Router, cors: CorsLayer) -> Router
where
    T: OpenApi + 'static,
{
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", T::openapi()))
        .merge(root)
        .nest("/api", apis)
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(middleware::from_fn(security_headers))
        .layer(cors)
        .layer(CompressionLayer::new())
}

/// Serve `router` until SIGINT/SIGTERM, then drain with `cleanup`.
///
/// Shutdown order:
/// 1. Signal received: the coordinator moves to draining and notifies subscribers
/// 2. The listener stops accepting; in-flight requests get `shutdown_timeout` to finish
/// 3. `cleanup` runs exactly once, bounded by `shutdown_timeout`
/// 4. The coordinator is marked terminated
///
/// The drain outcome is returned for logging; a failed or slow cleanup does
/// not turn into an error. Only bind and serve failures do.
///
/// # Example
/// ```ignore
/// let coordinator = ShutdownCoordinator::new();
/// let cleanup = async move { connection.close(timeout).await };
///
/// create_production_app(router, &config, coordinator, Duration::from_secs(10), cleanup).await?;
/// ```
pub async fn create_production_app<F, E>(
    router: Router,
    server_config: &ServerConfig,
    coordinator: ShutdownCoordinator,
    shutdown_timeout: Duration,
    cleanup: F,
) -> io::Result<DrainOutcome>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display,
{
    let listener = tokio::net::TcpListener::bind(server_config.address()).await?;
    info!("Server starting on {}", listener.local_addr()?);

    let signals = coordinator.clone();
    let signal_task = tokio::spawn(async move { signals.wait_for_signal().await });

    let graceful = coordinator.clone();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move { graceful.wait_for_shutdown().await })
        .into_future();
    tokio::pin!(server);

    let deadline = async {
        coordinator.wait_for_shutdown().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    let serve_result = tokio::select! {
        result = &mut server => result.inspect_err(|e| {
            tracing::error!("Server encountered an error: {:?}", e);
        }),
        _ = deadline => {
            warn!(
                "In-flight requests did not finish within {:?}, closing connections",
                shutdown_timeout
            );
            Ok(())
        }
    };

    let outcome = coordinator.drain(cleanup, shutdown_timeout).await;
    coordinator.mark_terminated();
    signal_task.abort();

    serve_result.map(|_| outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::cors::{CorsConfig, create_cors_layer};
    use axum::{body::Body, http::Request, http::StatusCode, routing::get};
    use tower::ServiceExt;

    #[derive(OpenApi)]
    #[openapi(info(title = "test"))]
    struct TestDoc;

    fn router() -> Router {
        create_router::<TestDoc>(
            Router::new().route("/", get(|| async { "root" })),
            Router::new().route("/ping", get(|| async { "pong" })),
            create_cors_layer(&CorsConfig::default()).unwrap(),
        )
    }

    async fn status_of(router: Router, uri: &str) -> StatusCode {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_router_mounts_root_and_api() {
        assert_eq!(status_of(router(), "/").await, StatusCode::OK);
        assert_eq!(status_of(router(), "/api/ping").await, StatusCode::OK);
        assert_eq!(status_of(router(), "/ping").await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_router_serves_openapi_document() {
        assert_eq!(
            status_of(router(), "/api-docs/openapi.json").await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_cors_preflight_for_allowed_origin() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/ping")
                    .header("origin", "http://localhost:5173")
                    .header("access-control-request-method", "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(
            headers["access-control-allow-origin"],
            "http://localhost:5173"
        );
        assert_eq!(headers["access-control-allow-credentials"], "true");
    }

    #[tokio::test]
    async fn test_production_app_drains_once_on_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        let config = ServerConfig::new("127.0.0.1".to_string(), 0);
        let trigger = coordinator.clone();

        let (tx, rx) = tokio::sync::oneshot::channel();
        let cleanup = async move {
            let _ = tx.send(());
            Err::<(), _>("close failed")
        };

        let serving = coordinator.clone();
        let server = tokio::spawn(async move {
            create_production_app(
                Router::new(),
                &config,
                serving,
                Duration::from_secs(1),
                cleanup,
            )
            .await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.shutdown();

        let outcome = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(outcome, DrainOutcome::Failed("close failed".to_string()));
        assert!(rx.await.is_ok());
        assert_eq!(coordinator.phase(), crate::server::ShutdownPhase::Terminated);
    }
}
