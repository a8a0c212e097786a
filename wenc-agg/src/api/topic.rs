//! Topic endpoints
//!
//! `GET /topic?q=...` runs the query as the session's newest query.
//!
//! | Outcome | Status |
//! |---|---|
//! | record found (possibly degraded) | 200 `{"status":"found","record":{...}}` |
//! | search found nothing | 200 `{"status":"no_results"}` |
//! | search itself failed | 502 `{"status":"unavailable","failure":{...}}` |
//! | empty query | 400 |
//! | superseded by a newer query | 409 |
//!
//! `GET /topic/current/graph` draws the displayed topic and its wider
//! knowledge-graph neighbourhood as Graphviz DOT.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::render::relation_graph_dot;
use crate::types::{TopicOutcome, TopicRecord};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct TopicParams {
    #[serde(default)]
    pub q: String,
}

/// GET /topic?q=...
pub async fn get_topic(
    State(state): State<AppState>,
    Query(params): Query<TopicParams>,
) -> ApiResult<Response> {
    info!(query = %params.q, "Topic requested");
    let outcome = state
        .orchestrator
        .resolve_topic_in(&state.session, &params.q)
        .await?
        .ok_or_else(|| ApiError::Conflict("query was superseded by a newer query".to_string()))?;

    let status = match outcome {
        TopicOutcome::Unavailable { .. } => StatusCode::BAD_GATEWAY,
        TopicOutcome::Found { .. } | TopicOutcome::NoResults => StatusCode::OK,
    };
    Ok((status, Json(outcome)).into_response())
}

/// GET /topic/current
pub async fn current_topic(State(state): State<AppState>) -> ApiResult<Json<TopicRecord>> {
    let record = state
        .session
        .current()
        .ok_or_else(|| ApiError::NotFound("no topic is displayed".to_string()))?;
    Ok(Json(TopicRecord::clone(&record)))
}

/// GET /topic/current/graph
pub async fn current_graph(State(state): State<AppState>) -> ApiResult<Response> {
    let record = state
        .session
        .current()
        .ok_or_else(|| ApiError::NotFound("no topic is displayed".to_string()))?;
    let neighbourhood = state.orchestrator.neighbourhood(&record).await;
    if let Some(failure) = &neighbourhood.failure {
        warn!(failure = %failure, "Graph drawn without the wider neighbourhood");
    }
    let dot = relation_graph_dot(&record, &neighbourhood.edges);
    Ok(([(header::CONTENT_TYPE, "text/vnd.graphviz; charset=utf-8")], dot).into_response())
}

/// Build topic routes
pub fn topic_routes() -> Router<AppState> {
    Router::new()
        .route("/topic", get(get_topic))
        .route("/topic/current", get(current_topic))
        .route("/topic/current/graph", get(current_graph))
}
