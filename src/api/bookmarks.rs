//! Bookmark API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use super::{non_empty, require_text, success, ApiResult};
use crate::auth;
use crate::errors::AppError;
use crate::models::{Bookmark, CreateBookmarkRequest, Dataset, UpdateBookmarkRequest};
use crate::AppState;

/// Query string for `GET /api/bookmarks`.
#[derive(Debug, Deserialize)]
pub struct ListBookmarksQuery {
    /// `all` includes private entries and requires the API key
    #[serde(default)]
    pub visibility: Option<String>,
}

/// GET /api/bookmarks - Public view, or everything with `?visibility=all`.
pub async fn list_bookmarks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListBookmarksQuery>,
) -> ApiResult<Dataset> {
    let include_private = query.visibility.as_deref() == Some("all");
    if include_private && !auth::is_authorized(&headers, state.config.api_key.as_deref()) {
        return Err(AppError::Unauthorized(
            "Private bookmarks require an API key".to_string(),
        ));
    }

    let data = state.store.get_current().await?;
    let version = data.version;
    if include_private {
        success(data, version)
    } else {
        success(data.public_view(), version)
    }
}

/// POST /api/bookmarks - Create a new bookmark at the end of its category.
pub async fn create_bookmark(
    State(state): State<AppState>,
    Json(request): Json<CreateBookmarkRequest>,
) -> ApiResult<Bookmark> {
    require_text(&request.title, "Title")?;
    require_text(&request.url, "URL")?;

    let mut data = state.store.get_current().await?;
    if data.category(&request.category_id).is_none() {
        return Err(AppError::Validation(format!(
            "Category {} does not exist",
            request.category_id
        )));
    }

    let now = Utc::now().to_rfc3339();
    let bookmark = Bookmark {
        id: uuid::Uuid::new_v4().to_string(),
        order: data.next_bookmark_order(&request.category_id),
        category_id: request.category_id,
        title: request.title,
        url: request.url,
        description: non_empty(request.description),
        icon_url: non_empty(request.icon_url),
        is_private: request.is_private,
        created_at: now.clone(),
        updated_at: now,
    };
    data.bookmarks.push(bookmark.clone());

    let saved = state.store.save_current(data, true).await?;
    success(bookmark, saved.version)
}

/// PUT /api/bookmarks/:id - Update a bookmark.
pub async fn update_bookmark(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateBookmarkRequest>,
) -> ApiResult<Bookmark> {
    if let Some(title) = &request.title {
        require_text(title, "Title")?;
    }
    if let Some(url) = &request.url {
        require_text(url, "URL")?;
    }

    let mut data = state.store.get_current().await?;
    let current_category = data
        .bookmarks
        .iter()
        .find(|b| b.id == id)
        .map(|b| b.category_id.clone())
        .ok_or_else(|| AppError::NotFound(format!("Bookmark {} not found", id)))?;

    // Moving to another category appends at its end.
    let moved_to = match request.category_id {
        Some(target) if target != current_category => {
            if data.category(&target).is_none() {
                return Err(AppError::Validation(format!(
                    "Category {} does not exist",
                    target
                )));
            }
            let order = data.next_bookmark_order(&target);
            Some((target, order))
        }
        _ => None,
    };

    let bookmark = data
        .bookmark_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("Bookmark {} not found", id)))?;
    if let Some(title) = request.title {
        bookmark.title = title;
    }
    if let Some(url) = request.url {
        bookmark.url = url;
    }
    if let Some(description) = request.description {
        bookmark.description = non_empty(Some(description));
    }
    if let Some(icon_url) = request.icon_url {
        bookmark.icon_url = non_empty(Some(icon_url));
    }
    if let Some(is_private) = request.is_private {
        bookmark.is_private = is_private;
    }
    if let Some((target, order)) = moved_to {
        bookmark.category_id = target;
        bookmark.order = order;
    }
    bookmark.updated_at = Utc::now().to_rfc3339();

    data.renormalize_bookmark_orders();
    let updated = data
        .bookmarks
        .iter()
        .find(|b| b.id == id)
        .cloned()
        .ok_or_else(|| AppError::Internal(format!("Bookmark {} vanished", id)))?;

    let saved = state.store.save_current(data, true).await?;
    success(updated, saved.version)
}

/// DELETE /api/bookmarks/:id - Delete a bookmark and close the gap in its category.
pub async fn delete_bookmark(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let mut data = state.store.get_current().await?;
    let idx = data
        .bookmarks
        .iter()
        .position(|b| b.id == id)
        .ok_or_else(|| AppError::NotFound(format!("Bookmark {} not found", id)))?;

    data.bookmarks.remove(idx);
    data.renormalize_bookmark_orders();

    let saved = state.store.save_current(data, true).await?;
    success((), saved.version)
}
