//! Category API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{require_text, success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    Category, CleanupReport, CreateCategoryRequest, Dataset, UpdateCategoryRequest,
};
use crate::AppState;

fn ensure_unique_name(data: &Dataset, name: &str, except_id: Option<&str>) -> Result<(), AppError> {
    let taken = data
        .categories
        .iter()
        .any(|c| c.name == name && Some(c.id.as_str()) != except_id);
    if taken {
        return Err(AppError::Validation(format!(
            "Category name {:?} already exists",
            name
        )));
    }
    Ok(())
}

/// POST /api/categories - Create a new category at the end of the list.
pub async fn create_category(
    State(state): State<AppState>,
    Json(request): Json<CreateCategoryRequest>,
) -> ApiResult<Category> {
    require_text(&request.name, "Category name")?;

    let mut data = state.store.get_current().await?;
    ensure_unique_name(&data, &request.name, None)?;

    let category = Category::new(
        request.name,
        data.categories.len() as i64,
        request.visibility.unwrap_or_default(),
    );
    let id = category.id.clone();
    data.categories.push(category);
    data.renormalize_category_orders();

    let created = data
        .category(&id)
        .cloned()
        .ok_or_else(|| AppError::Internal(format!("Category {} vanished", id)))?;
    let saved = state.store.save_current(data, true).await?;
    success(created, saved.version)
}

/// PUT /api/categories/:id - Rename, change visibility or move a category.
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateCategoryRequest>,
) -> ApiResult<Category> {
    let mut data = state.store.get_current().await?;
    if data.category(&id).is_none() {
        return Err(AppError::NotFound(format!("Category {} not found", id)));
    }

    if let Some(name) = &request.name {
        require_text(name, "Category name")?;
        ensure_unique_name(&data, name, Some(&id))?;
    }

    let category = data
        .category_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;
    if let Some(name) = request.name {
        category.name = name;
    }
    if let Some(visibility) = request.visibility {
        category.visibility = visibility;
    }
    if let Some(order) = request.order {
        category.order = order;
    }
    let updated = category.clone();

    let saved = state.store.save_current(data, true).await?;
    success(updated, saved.version)
}

/// DELETE /api/categories/:id - Delete a category together with its bookmarks.
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let mut data = state.store.get_current().await?;
    if data.remove_categories(std::slice::from_ref(&id)).is_empty() {
        return Err(AppError::NotFound(format!("Category {} not found", id)));
    }

    let saved = state.store.save_current(data, true).await?;
    success((), saved.version)
}

/// GET /api/categories/empty - List categories without bookmarks.
pub async fn list_empty_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    let data = state.store.get_current().await?;
    let empty = data.empty_categories().into_iter().cloned().collect();
    success(empty, data.version)
}

/// POST /api/categories/cleanup - Delete every category without bookmarks.
pub async fn cleanup_empty_categories(State(state): State<AppState>) -> ApiResult<CleanupReport> {
    let mut data = state.store.get_current().await?;
    let ids: Vec<String> = data
        .empty_categories()
        .into_iter()
        .map(|c| c.id.clone())
        .collect();

    if ids.is_empty() {
        let version = data.version;
        return success(
            CleanupReport {
                deleted_count: 0,
                deleted_categories: Vec::new(),
            },
            version,
        );
    }

    let deleted = data.remove_categories(&ids);
    tracing::info!("Removing {} empty categories", deleted.len());

    let saved = state.store.save_current(data, true).await?;
    success(
        CleanupReport {
            deleted_count: deleted.len(),
            deleted_categories: deleted,
        },
        saved.version,
    )
}
