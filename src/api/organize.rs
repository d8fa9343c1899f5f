//! Reordering and batch endpoints.

use axum::{extract::State, Json};
use chrono::Utc;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{BatchData, BatchOperation, BatchRequest, BatchResult, Dataset, SortRequest};
use crate::AppState;

/// POST /api/sort - Apply new category and bookmark orders.
///
/// Listed items come first in the given order; unlisted siblings follow in
/// their current order. Unknown ids are ignored.
pub async fn sort(
    State(state): State<AppState>,
    Json(request): Json<SortRequest>,
) -> ApiResult<()> {
    let mut data = state.store.get_current().await?;

    if let Some(order) = &request.categories_order {
        data.apply_category_order(order);
    }

    if let Some(per_category) = &request.bookmarks_order {
        for (category_id, ids) in per_category {
            data.apply_bookmark_order(category_id, ids);
        }
    }

    let saved = state.store.save_current(data, false).await?;
    state.store.backup(&saved).await?;
    success((), saved.version)
}

/// POST /api/batch - Delete, move or edit many items at once.
pub async fn batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> ApiResult<BatchResult> {
    match request.operation {
        BatchOperation::DeleteCategories if request.category_ids.is_empty() => {
            return Err(AppError::Validation("Invalid category IDs".to_string()));
        }
        BatchOperation::Delete | BatchOperation::Move | BatchOperation::Edit
            if request.bookmark_ids.is_empty() =>
        {
            return Err(AppError::Validation("Invalid bookmark IDs".to_string()));
        }
        _ => {}
    }

    let mut data = state.store.get_current().await?;
    let extra = request.data.unwrap_or_default();

    let affected = match request.operation {
        BatchOperation::Delete => delete_bookmarks(&mut data, &request.bookmark_ids),
        BatchOperation::DeleteCategories => data.remove_categories(&request.category_ids).len(),
        BatchOperation::Move => move_bookmarks(&mut data, &request.bookmark_ids, &extra)?,
        BatchOperation::Edit => edit_bookmarks(&mut data, &request.bookmark_ids, &extra),
    };

    if affected == 0 {
        let version = data.version;
        return success(BatchResult { affected }, version);
    }

    let saved = state.store.save_current(data, true).await?;
    success(BatchResult { affected }, saved.version)
}

fn delete_bookmarks(data: &mut Dataset, ids: &[String]) -> usize {
    let before = data.bookmarks.len();
    data.bookmarks.retain(|b| !ids.contains(&b.id));
    data.renormalize_bookmark_orders();
    before - data.bookmarks.len()
}

fn move_bookmarks(data: &mut Dataset, ids: &[String], extra: &BatchData) -> Result<usize, AppError> {
    let target = extra
        .category_id
        .clone()
        .ok_or_else(|| AppError::Validation("Category ID required".to_string()))?;
    if data.category(&target).is_none() {
        return Err(AppError::Validation(format!(
            "Category {} does not exist",
            target
        )));
    }

    let now = Utc::now().to_rfc3339();
    let mut next_order = data.next_bookmark_order(&target);
    let mut moved = 0;
    for id in ids {
        if let Some(bookmark) = data.bookmark_mut(id) {
            bookmark.category_id = target.clone();
            bookmark.order = next_order;
            bookmark.updated_at = now.clone();
            next_order += 1;
            moved += 1;
        }
    }

    data.renormalize_bookmark_orders();
    Ok(moved)
}

fn edit_bookmarks(data: &mut Dataset, ids: &[String], extra: &BatchData) -> usize {
    let Some(is_private) = extra.is_private else {
        return 0;
    };

    let now = Utc::now().to_rfc3339();
    let mut edited = 0;
    for bookmark in data.bookmarks.iter_mut().filter(|b| ids.contains(&b.id)) {
        bookmark.is_private = is_private;
        bookmark.updated_at = now.clone();
        edited += 1;
    }
    edited
}
