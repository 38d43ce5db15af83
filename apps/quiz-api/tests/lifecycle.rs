//! Startup against a real MongoDB container.
//!
//! Run with `cargo test -p quiz_api -- --ignored` (requires Docker).

use axum::body::Body;
use axum::http::{Request, StatusCode};
use database::mongodb::ReadyState;
use http_body_util::BodyExt;
use quiz_api::{Application, Config, FeatureRouters};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use test_utils::TestMongo;
use tower::ServiceExt;

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_health_reports_connected_database() {
    let mongo = TestMongo::new().await;
    let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/questions.json");

    let config = temp_env::with_vars(
        [
            ("MONGO_URI", Some(mongo.uri_for("quiz"))),
            ("JWT_SECRET", Some("quiz-api-test-secret-0123456789abcdef".to_string())),
            ("QUESTIONS_PATH", Some(fixture.display().to_string())),
        ],
        || <Config as core_config::FromEnv>::from_env().unwrap(),
    );

    let app = Application::build(config, Instant::now()).await.unwrap();
    let router = app.router(FeatureRouters::default());

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["database"], "connected");
    assert_eq!(json["connectionStats"]["readyState"], 1);
    assert_eq!(json["connectionStats"]["name"], "quiz");
    assert!(json["connectionStats"]["poolSize"].is_number());

    let response = router
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    app.connection().close(Duration::from_secs(5)).await.unwrap();
    assert_eq!(
        app.state().health.stats().ready_state(),
        ReadyState::Disconnected
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_connectivity_check_lists_collections() {
    let mongo = TestMongo::new().await;
    let config = database::mongodb::ConnectionConfig::new(mongo.uri_for("quiz"));

    let report = quiz_api::connectivity::check_connection(config, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(report.database, "quiz");
    assert!(report.collections.is_empty());
}
