//! Bookmark model matching the frontend Bookmark interface.

use serde::{Deserialize, Serialize};

/// A single saved link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,
    pub category_id: String,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub order: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating a new bookmark.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookmarkRequest {
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

/// Request body for updating an existing bookmark.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookmarkRequest {
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub is_private: Option<bool>,
}

/// Request body for reordering categories and bookmarks in one call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortRequest {
    /// Category ids in their new display order
    #[serde(default)]
    pub categories_order: Option<Vec<String>>,
    /// Per category, bookmark ids in their new display order
    #[serde(default)]
    pub bookmarks_order: Option<std::collections::HashMap<String, Vec<String>>>,
}

/// Operation selector for `POST /api/batch`.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BatchOperation {
    Delete,
    DeleteCategories,
    Move,
    Edit,
}

/// Extra payload for batch `move` and `edit`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchData {
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub is_private: Option<bool>,
}

/// Request body for batch operations.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub operation: BatchOperation,
    #[serde(default)]
    pub bookmark_ids: Vec<String>,
    #[serde(default)]
    pub category_ids: Vec<String>,
    #[serde(default)]
    pub data: Option<BatchData>,
}

/// Number of items touched by a batch operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub affected: usize,
}
