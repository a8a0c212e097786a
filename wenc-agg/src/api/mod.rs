//! HTTP API handlers for wenc
//!
//! JSON over HTTP: topics, the relationship graph, the session's bookmarks
//! and a health check.

pub mod bookmarks;
pub mod health;
pub mod topic;

pub use bookmarks::bookmark_routes;
pub use health::health_routes;
pub use topic::topic_routes;
