//! Import and export endpoints.

use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use super::{non_empty, success, ApiResult};
use crate::errors::AppError;
use crate::export;
use crate::models::{
    Bookmark, Category, Dataset, ExportFormat, ImportReport, ImportRequest, SkippedItem,
};
use crate::AppState;

/// Query string for `GET /api/export`.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

/// GET /api/export - Download the dataset as JSON or Netscape HTML.
pub async fn export_bookmarks(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let data = state.store.get_current().await?;
    let now = Utc::now();
    let body = export::render(&data, query.format, now)?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::file_name(query.format, now.date_naive())
    );
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| AppError::Internal(format!("Invalid export header: {}", e)))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(query.format.content_type()),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// POST /api/import - Merge categories and bookmarks from an export file.
///
/// Categories are matched by name; bookmarks whose URL is already stored are skipped.
pub async fn import_bookmarks(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<ImportReport> {
    tracing::info!(
        "Starting import: {} categories, {} bookmarks",
        request.categories.len(),
        request.bookmarks.len()
    );

    let mut data = state.store.get_current().await?;
    let report = merge_import(&mut data, request);

    tracing::info!(
        "Import finished: {} categories and {} bookmarks added, {} items skipped",
        report.imported_categories,
        report.imported_bookmarks,
        report.skipped_items.len()
    );

    if report.imported_categories == 0 && report.imported_bookmarks == 0 {
        let version = data.version;
        return success(report, version);
    }

    let saved = state.store.save_current(data, true).await?;
    success(report, saved.version)
}

fn skipped(kind: &str, name: &str, reason: &str) -> SkippedItem {
    SkippedItem {
        kind: kind.to_string(),
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn merge_import(data: &mut Dataset, request: ImportRequest) -> ImportReport {
    let mut report = ImportReport::default();
    let mut category_ids: HashMap<String, String> = HashMap::new();

    for incoming in request.categories {
        if let Some(existing) = data.category_by_name(&incoming.name) {
            category_ids.insert(incoming.id, existing.id.clone());
            report.skipped_categories += 1;
            report
                .skipped_items
                .push(skipped("category", &incoming.name, "category already exists"));
            continue;
        }
        if incoming.name.trim().is_empty() {
            report.skipped_categories += 1;
            report
                .skipped_items
                .push(skipped("category", &incoming.name, "missing name"));
            continue;
        }

        let category = Category::new(
            incoming.name,
            data.categories.len() as i64,
            incoming.visibility.unwrap_or_default(),
        );
        category_ids.insert(incoming.id, category.id.clone());
        data.categories.push(category);
        report.imported_categories += 1;
    }

    let mut known_urls: HashSet<String> = data.bookmarks.iter().map(|b| b.url.clone()).collect();
    let now = Utc::now().to_rfc3339();

    for incoming in request.bookmarks {
        let Some(category_id) = category_ids.get(&incoming.category_id).cloned() else {
            report.skipped_bookmarks += 1;
            report
                .skipped_items
                .push(skipped("bookmark", &incoming.title, "category not found"));
            continue;
        };
        if incoming.title.trim().is_empty() || incoming.url.trim().is_empty() {
            report.skipped_bookmarks += 1;
            report
                .skipped_items
                .push(skipped("bookmark", &incoming.title, "missing title or url"));
            continue;
        }
        if !known_urls.insert(incoming.url.clone()) {
            report.skipped_bookmarks += 1;
            report
                .skipped_items
                .push(skipped("bookmark", &incoming.title, "bookmark already exists"));
            continue;
        }

        let order = data.next_bookmark_order(&category_id);
        data.bookmarks.push(Bookmark {
            id: uuid::Uuid::new_v4().to_string(),
            order,
            category_id,
            title: incoming.title,
            url: incoming.url,
            description: non_empty(incoming.description),
            icon_url: non_empty(incoming.icon_url),
            is_private: incoming.is_private,
            created_at: now.clone(),
            updated_at: now.clone(),
        });
        report.imported_bookmarks += 1;
    }

    data.renormalize_category_orders();
    data.renormalize_bookmark_orders();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImportBookmark, ImportCategory};

    fn import_bookmark(category_id: &str, title: &str, url: &str) -> ImportBookmark {
        ImportBookmark {
            category_id: category_id.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            description: None,
            icon_url: None,
            is_private: false,
        }
    }

    #[test]
    fn test_merge_import_matches_categories_by_name() {
        let mut data = Dataset::seed(String::new());
        let work_id = data.categories[1].id.clone();

        let report = merge_import(
            &mut data,
            ImportRequest {
                categories: vec![
                    ImportCategory {
                        id: "old-work".to_string(),
                        name: "Work".to_string(),
                        visibility: None,
                    },
                    ImportCategory {
                        id: "old-news".to_string(),
                        name: "News".to_string(),
                        visibility: None,
                    },
                ],
                bookmarks: vec![
                    import_bookmark("old-work", "Tracker", "https://tracker.example"),
                    import_bookmark("old-news", "Paper", "https://paper.example"),
                    import_bookmark("old-news", "Paper again", "https://paper.example"),
                    import_bookmark("gone", "Orphan", "https://orphan.example"),
                ],
            },
        );

        assert_eq!(report.imported_categories, 1);
        assert_eq!(report.skipped_categories, 1);
        assert_eq!(report.imported_bookmarks, 2);
        assert_eq!(report.skipped_bookmarks, 2);
        assert_eq!(data.categories.len(), 4);
        assert_eq!(data.category_by_name("News").unwrap().order, 3);

        let tracker = data.bookmarks.iter().find(|b| b.title == "Tracker").unwrap();
        assert_eq!(tracker.category_id, work_id);
    }

    #[test]
    fn test_merge_import_skips_known_urls() {
        let mut data = Dataset::seed(String::new());
        let first = ImportRequest {
            categories: vec![ImportCategory {
                id: "c".to_string(),
                name: "Default".to_string(),
                visibility: None,
            }],
            bookmarks: vec![import_bookmark("c", "Home", "https://home.example")],
        };
        let second = first.clone();

        assert_eq!(merge_import(&mut data, first).imported_bookmarks, 1);
        let report = merge_import(&mut data, second);

        assert_eq!(report.imported_bookmarks, 0);
        assert_eq!(report.skipped_items[1].reason, "bookmark already exists");
        assert_eq!(data.bookmarks.len(), 1);
    }
}
