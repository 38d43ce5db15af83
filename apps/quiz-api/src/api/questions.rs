//! Question set lookup

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::questions::QuestionBank;

#[derive(Debug, Serialize, ToSchema)]
pub struct TopicNotFound {
    #[schema(example = "Topic not found")]
    pub message: String,
}

/// Routes nested under `/api`
pub fn router(questions: Arc<QuestionBank>) -> Router {
    Router::new()
        .route("/questions/{topicName}", get(get_topic))
        .with_state(questions)
}

/// Get the question set for a topic
#[utoipa::path(
    get,
    path = "/api/questions/{topicName}",
    tag = "questions",
    params(("topicName" = String, Path, description = "Topic key, e.g. AlgorithmsSorting")),
    responses(
        (status = 200, description = "Question set stored under the topic", body = serde_json::Value),
        (status = 404, description = "Unknown topic", body = TopicNotFound)
    )
)]
pub async fn get_topic(
    State(questions): State<Arc<QuestionBank>>,
    Path(topic_name): Path<String>,
) -> Response {
    match questions.topic(&topic_name) {
        Some(topic) => Json(topic.clone()).into_response(),
        None => {
            tracing::debug!(topic = %topic_name, "Topic not found");
            (
                StatusCode::NOT_FOUND,
                Json(TopicNotFound {
                    message: "Topic not found".to_string(),
                }),
            )
                .into_response()
        }
    }
}
