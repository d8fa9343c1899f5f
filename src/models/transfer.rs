//! Import and export documents.

use serde::{Deserialize, Serialize};

use super::{Bookmark, Category, Visibility};

/// Output format for `GET /api/export`.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Html,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Html => "html",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json; charset=utf-8",
            ExportFormat::Html => "text/html; charset=utf-8",
        }
    }
}

/// Full JSON export of the dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: i64,
    pub exported_at: String,
    pub categories: Vec<Category>,
    pub bookmarks: Vec<Bookmark>,
}

/// A category as it appears in an import file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

/// A bookmark as it appears in an import file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBookmark {
    pub category_id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

/// Request body for `POST /api/import`.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportRequest {
    pub categories: Vec<ImportCategory>,
    pub bookmarks: Vec<ImportBookmark>,
}

/// Why an import item was not added.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkippedItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub reason: String,
}

/// Counts of a finished import.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported_categories: usize,
    pub imported_bookmarks: usize,
    pub skipped_categories: usize,
    pub skipped_bookmarks: usize,
    pub skipped_items: Vec<SkippedItem>,
}
