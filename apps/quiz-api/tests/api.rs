//! Router behaviour without a live database.

use axum::{
    Router,
    body::{Body, Bytes},
    http::{Request, StatusCode, header},
    routing::{get, post},
};
use axum_helpers::{CorsConfig, JwtAuth, JwtConfig, create_cors_layer};
use database::mongodb::{ConnectionState, Endpoint, StatsReporter};
use http_body_util::BodyExt;
use quiz_api::api;
use quiz_api::questions::QuestionBank;
use quiz_api::{AppState, FeatureRouters};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceExt;

const SECRET: &str = "quiz-api-test-secret-0123456789abcdef";

fn jwt() -> JwtAuth {
    JwtAuth::new(&JwtConfig::new(SECRET).unwrap())
}

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/questions.json")
}

fn state(connection: Arc<ConnectionState>, max_upload_bytes: usize) -> AppState {
    AppState::new(
        QuestionBank::load(fixture_path()).unwrap(),
        StatsReporter::new(connection),
        Instant::now(),
        jwt(),
        max_upload_bytes,
    )
}

fn app_for(connection: Arc<ConnectionState>, features: FeatureRouters) -> Router {
    api::app(
        &state(connection, 16),
        create_cors_layer(&CorsConfig::default()).unwrap(),
        features,
    )
}

fn app_with(features: FeatureRouters) -> Router {
    app_for(ConnectionState::new(), features)
}

fn app() -> Router {
    app_with(FeatureRouters::default())
}

fn connected() -> Arc<ConnectionState> {
    let connection = ConnectionState::new();
    connection.force_connected(Endpoint {
        host: "db.local".to_string(),
        port: 27017,
        database: "quiz".to_string(),
    });
    connection
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_root_reports_running() {
    let response = app().oneshot(get_request("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, "API is running...");
}

#[tokio::test]
async fn test_health_while_disconnected() {
    let response = app().oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "OK");
    assert_eq!(json["database"], "disconnected");
    assert!(json["uptime"].as_f64().unwrap() >= 0.0);
    assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    assert_eq!(json["connectionStats"]["readyState"], 0);
    assert_eq!(json["connectionStats"]["poolSize"], "N/A");
    assert_eq!(json["connectionStats"]["activeConnections"], "N/A");
}

#[tokio::test]
async fn test_health_while_connected() {
    let response = app_for(connected(), FeatureRouters::default())
        .oneshot(get_request("/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "OK");
    assert_eq!(json["database"], "connected");
    assert_eq!(
        json["connectionStats"],
        json!({
            "readyState": 1,
            "host": "db.local",
            "port": 27017,
            "name": "quiz",
            "poolSize": 0,
            "activeConnections": 0,
        })
    );
}

#[tokio::test]
async fn test_health_reports_error_when_state_unreadable() {
    let connection = ConnectionState::new();
    connection.poison();
    let app = app_for(connection, FeatureRouters::default());

    let response = app.clone().oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ERROR");
    assert_eq!(json["database"], "unknown");
    assert!(json["message"].as_str().unwrap().contains("unavailable"));

    // Still serving afterwards
    let response = app.oneshot(get_request("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_ready_while_connected() {
    let response = app_for(connected(), FeatureRouters::default())
        .oneshot(get_request("/ready"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"status": "ready", "database": "connected"})
    );
}

#[tokio::test]
async fn test_health_keeps_same_shape_across_calls() {
    let app = app();
    let first = body_json(app.clone().oneshot(get_request("/health")).await.unwrap()).await;
    let second = body_json(app.oneshot(get_request("/health")).await.unwrap()).await;

    let keys = |v: &Value| {
        let mut keys: Vec<String> = v.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    };
    assert_eq!(keys(&first), keys(&second));
    assert_eq!(first["database"], second["database"]);
}

#[tokio::test]
async fn test_ready_while_disconnected() {
    let response = app().oneshot(get_request("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_json(response).await,
        json!({"status": "not ready", "database": "disconnected"})
    );
}

#[tokio::test]
async fn test_questions_for_known_topic() {
    let response = app()
        .oneshot(get_request("/api/questions/DataStructuresStacks"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["answer"], "pop");
}

#[tokio::test]
async fn test_questions_return_exact_stored_value() {
    let fixture: Value =
        serde_json::from_str(&std::fs::read_to_string(fixture_path()).unwrap()).unwrap();

    let response = app()
        .oneshot(get_request("/api/questions/AlgorithmsSorting"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, fixture["AlgorithmsSorting"]);
}

#[tokio::test]
async fn test_questions_for_unknown_topic() {
    let response = app()
        .oneshot(get_request("/api/questions/Cooking"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({"message": "Topic not found"}));
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let response = app().oneshot(get_request("/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_metrics_endpoint_responds() {
    observability::init_metrics().unwrap();
    let response = app().oneshot(get_request("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = String::from_utf8(body_bytes(response).await.to_vec()).unwrap();
    assert!(text.contains("mongodb_ready_state"));
}

fn protected_features() -> FeatureRouters {
    FeatureRouters {
        auth: Some(Router::new().route("/login", post(|| async { "login" }))),
        test: Some(Router::new().route("/ping", get(|| async { "pong" }))),
        upload: Some(Router::new().route("/", post(|body: Bytes| async move { body.len().to_string() }))),
        progress: Some(Router::new().route("/ping", get(|| async { "progress" }))),
    }
}

fn bearer() -> String {
    let token = jwt().create_access_token("user-1", "user@example.com").unwrap();
    format!("Bearer {token}")
}

#[tokio::test]
async fn test_public_feature_routers_are_open() {
    let app = app_with(protected_features());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get_request("/progress/ping")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_test_router_requires_token() {
    let app = app_with(protected_features());

    let response = app.clone().oneshot(get_request("/test/ping")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/test/ping")
                .header(header::AUTHORIZATION, bearer())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, "pong");
}

#[tokio::test]
async fn test_upload_enforces_body_limit() {
    let app = app_with(protected_features());
    let upload = |size: usize| {
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::AUTHORIZATION, bearer())
            .body(Body::from(vec![b'x'; size]))
            .unwrap()
    };

    let response = app.clone().oneshot(upload(8)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(upload(64)).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
