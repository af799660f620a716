use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::app::AppState;

const UNKNOWN_TOPIC: &str = "Unknown Topic";

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AnalyzeRequest {
    #[serde(default)]
    topic: Option<String>,
}

impl AnalyzeRequest {
    /// 未指定または `null` のトピックは `Unknown Topic` として扱う。それ以外は受け取ったまま。
    fn topic(&self) -> &str {
        self.topic.as_deref().unwrap_or(UNKNOWN_TOPIC)
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub(crate) async fn analyze_topic(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeRequest>,
) -> Response {
    let topic = payload.topic();
    info!(topic, "analysis requested");

    match state.pipeline().analyze(topic).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(pipeline_error) => {
            error!(topic, error = %pipeline_error, "analysis request failed");
            let body = Json(ErrorResponse {
                error: pipeline_error.to_string(),
            });
            (StatusCode::BAD_GATEWAY, body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, http::header};

    use super::*;
    use crate::api::test_support::{body_json, send, test_router};
    use crate::pipeline::model::Article;

    fn post_json(body: &str) -> Request<Body> {
        Request::post("/api/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[test]
    fn only_missing_topic_defaults_to_unknown() {
        assert_eq!(AnalyzeRequest::default().topic(), UNKNOWN_TOPIC);
        let null: AnalyzeRequest =
            serde_json::from_str(r#"{"topic": null}"#).expect("deserialize");
        assert_eq!(null.topic(), UNKNOWN_TOPIC);
        let padded = AnalyzeRequest {
            topic: Some(" Iran ".to_string()),
        };
        assert_eq!(padded.topic(), " Iran ");
    }

    #[tokio::test]
    async fn analyze_keeps_topic_as_supplied() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = send(
            test_router(dir.path(), Some(Vec::new())),
            post_json(r#"{"topic": " Iran "}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["topic"], " Iran ");
        assert!(dir.path().join("-iran-.json").is_file());
    }

    #[tokio::test]
    async fn analyze_returns_result_and_writes_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let articles = vec![Article::new(
            "Allies welcome ceasefire",
            "",
            "Reuters",
            "Leaders praised the agreement.",
        )];
        let router = test_router(dir.path(), Some(articles));

        let response = send(router, post_json(r#"{"topic": "Iran Crisis"}"#)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["topic"], "Iran Crisis");
        assert_eq!(body["articles"][0]["stance"], "IN_FAVOR");
        assert!(body["articles"][0]["scores"]["overall"].is_number());
        assert_eq!(body["summary"], "Generation backend unavailable");
        assert!(body["prompt_used"].as_str().is_some_and(|p| p.contains("Iran Crisis")));
        assert!(dir.path().join("iran-crisis.json").is_file());
    }

    #[tokio::test]
    async fn analyze_without_topic_uses_unknown_topic() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = send(test_router(dir.path(), Some(Vec::new())), post_json("{}")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["topic"], UNKNOWN_TOPIC);
        assert!(dir.path().join("unknown-topic.json").is_file());
    }

    #[tokio::test]
    async fn source_failure_maps_to_bad_gateway() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = send(test_router(dir.path(), None), post_json(r#"{"topic": "iran"}"#)).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert!(
            body["error"]
                .as_str()
                .is_some_and(|e| e.starts_with("failed to gather articles for topic: "))
        );
        assert!(!dir.path().join("iran.json").exists());
    }
}
