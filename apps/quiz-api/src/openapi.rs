//! OpenAPI documentation configuration

use utoipa::OpenApi;

use crate::api::{self, health, questions};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Quiz API",
        version = "0.1.0",
        description = "Quiz application backend: topic question sets and service health",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        api::root,
        health::health,
        health::ready,
        questions::get_topic
    ),
    components(schemas(
        health::HealthReport,
        health::HealthError,
        health::ReadyReport,
        questions::TopicNotFound
    )),
    tags(
        (name = "health", description = "Liveness, health and readiness"),
        (name = "questions", description = "Question sets by topic")
    )
)]
pub struct ApiDoc;
