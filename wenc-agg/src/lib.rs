//! wenc: world encyclopedia aggregator
//!
//! Resolves a free-text topic against a public encyclopedia, links it to a
//! knowledge graph and enriches it with country facts, current weather and
//! media, then merges everything into one [`types::TopicRecord`].
//!
//! The entry point is [`orchestrator::Orchestrator::resolve_topic`]; the
//! [`api`] module exposes it over HTTP.

pub mod analysis;
pub mod api;
pub mod bookmarks;
pub mod cache;
pub mod error;
pub mod mentions;
pub mod orchestrator;
pub mod relations;
pub mod render;
pub mod resolver;
pub mod session;
pub mod sources;
pub mod types;

pub use error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use wenc_common::Clock;

use crate::orchestrator::Orchestrator;
use crate::session::Session;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// The interactive session: displayed topic and bookmarks
    pub session: Arc<Session>,
    pub clock: Arc<dyn Clock>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, clock: Arc<dyn Clock>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            session: Arc::new(Session::new()),
            startup_time: clock.now(),
            clock,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::topic_routes())
        .merge(api::bookmark_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
