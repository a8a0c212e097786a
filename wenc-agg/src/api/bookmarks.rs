//! Bookmark endpoints
//!
//! Bookmarks live in the session; export is the only way to keep them.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::bookmarks::Bookmark;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct BookmarkAdded {
    /// false when the topic was already bookmarked
    pub added: bool,
    pub bookmark: Bookmark,
}

/// GET /bookmarks
pub async fn list_bookmarks(State(state): State<AppState>) -> Json<Vec<Bookmark>> {
    Json(state.session.bookmarks().items().to_vec())
}

/// POST /bookmarks
///
/// Bookmarks the topic currently on display. 201 when added, 200 when it
/// was already bookmarked, 404 when nothing is displayed.
pub async fn add_bookmark(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let record = state
        .session
        .current()
        .ok_or_else(|| ApiError::NotFound("no topic is displayed".to_string()))?;

    let bookmark = Bookmark::from_record(&record, state.clock.now());
    let added = state.session.bookmarks().add(bookmark.clone());
    if added {
        info!(title = %bookmark.title, "Bookmark added");
    }

    let status = if added { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(BookmarkAdded { added, bookmark })))
}

/// DELETE /bookmarks
pub async fn clear_bookmarks(State(state): State<AppState>) -> StatusCode {
    state.session.bookmarks().clear();
    StatusCode::NO_CONTENT
}

/// DELETE /bookmarks/:title
pub async fn remove_bookmark(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> ApiResult<StatusCode> {
    if state.session.bookmarks().remove(&title) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("no bookmark titled {title:?}")))
    }
}

/// GET /bookmarks/export
pub async fn export_bookmarks(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let body = state.session.bookmarks().export_json()?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"bookmarks.json\""),
        ],
        body,
    ))
}

/// Build bookmark routes
pub fn bookmark_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/bookmarks",
            get(list_bookmarks).post(add_bookmark).delete(clear_bookmarks),
        )
        .route("/bookmarks/export", get(export_bookmarks))
        .route("/bookmarks/:title", delete(remove_bookmark))
}
