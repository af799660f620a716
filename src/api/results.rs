use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::app::AppState;
use crate::pipeline::persist::ResultCache;

#[derive(Debug, Deserialize)]
pub(crate) struct ResultsQuery {
    topic: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// キャッシュ済みの分析結果を返す。分析は実行しない。
pub(crate) async fn cached_result(
    State(state): State<AppState>,
    Query(query): Query<ResultsQuery>,
) -> Response {
    match state.pipeline().cache().load(&query.topic).await {
        Ok(Some(result)) => (StatusCode::OK, Json(result)).into_response(),
        Ok(None) => {
            let body = Json(ErrorResponse {
                error: format!("no cached result for topic: {}", query.topic),
            });
            (StatusCode::NOT_FOUND, body).into_response()
        }
        Err(cache_error) => {
            error!(topic = %query.topic, error = %cache_error, "failed to read cached result");
            let body = Json(ErrorResponse {
                error: "failed to read cached result".to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, http::header};

    use super::*;
    use crate::api::test_support::{body_json, send, test_router};
    use crate::pipeline::model::Article;

    #[tokio::test]
    async fn returns_404_before_analysis_and_cached_result_after() {
        let dir = tempfile::tempdir().expect("tempdir");
        let articles = vec![Article::new("Talks resume", "", "AP", "Body")];
        let router = test_router(dir.path(), Some(articles));

        let missing = send(
            router.clone(),
            Request::get("/api/results?topic=Iran%20Crisis")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let analyzed = send(
            router.clone(),
            Request::post("/api/analyze")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"topic": "Iran Crisis"}"#))
                .expect("request"),
        )
        .await;
        assert_eq!(analyzed.status(), StatusCode::OK);

        let cached = send(
            router,
            Request::get("/api/results?topic=Iran%20Crisis")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(cached.status(), StatusCode::OK);
        let body = body_json(cached).await;
        assert_eq!(body["topic"], "Iran Crisis");
        assert_eq!(body["articles"][0]["title"], "Talks resume");
    }

    #[tokio::test]
    async fn corrupt_cache_entry_is_a_server_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("iran.json"), b"{not json").expect("write entry");

        let response = send(
            test_router(dir.path(), Some(Vec::new())),
            Request::get("/api/results?topic=iran")
                .body(Body::empty())
                .expect("request"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
