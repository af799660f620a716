pub(crate) mod analyze;
pub(crate) mod health;
pub(crate) mod metrics;
pub(crate) mod results;
pub(crate) mod topics;

use axum::{
    Router,
    routing::{get, post},
};

use crate::app::AppState;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/metrics", get(metrics::exporter))
        .route("/api/topics", get(topics::list_topics))
        .route("/api/analyze", post(analyze::analyze_topic))
        .route("/api/results", get(results::cached_result))
        .with_state(state)
}
