//! Export rendering: pretty JSON and the Netscape bookmark file format.

use chrono::{DateTime, NaiveDate, Utc};

use crate::errors::AppError;
use crate::models::{Bookmark, Dataset, ExportDocument, ExportFormat};

/// Build the JSON export document for `data`.
pub fn export_document(data: &Dataset, exported_at: DateTime<Utc>) -> ExportDocument {
    ExportDocument {
        version: data.version,
        exported_at: exported_at.to_rfc3339(),
        categories: data.categories.clone(),
        bookmarks: data.bookmarks.clone(),
    }
}

/// Render `data` in the requested format.
pub fn render(
    data: &Dataset,
    format: ExportFormat,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(&export_document(data, now))?),
        ExportFormat::Html => Ok(render_html(data, now)),
    }
}

/// Render a Netscape bookmark file. Empty categories are left out.
pub fn render_html(data: &Dataset, now: DateTime<Utc>) -> String {
    let now_secs = now.timestamp();
    let mut html = String::new();

    html.push_str("<!DOCTYPE NETSCAPE-Bookmark-file-1>\n");
    html.push_str("<META HTTP-EQUIV=\"Content-Type\" CONTENT=\"text/html; charset=UTF-8\">\n");
    html.push_str("<TITLE>Bookmarks</TITLE>\n");
    html.push_str("<H1>Bookmarks</H1>\n");
    html.push_str("<DL><p>\n");
    html.push_str(&format!(
        "    <DT><H3 ADD_DATE=\"{0}\" LAST_MODIFIED=\"{0}\">Nav Bookmarks Export</H3>\n",
        now_secs
    ));
    html.push_str("    <DL><p>\n");

    let mut categories: Vec<_> = data.categories.iter().collect();
    categories.sort_by_key(|c| c.order);

    for category in categories {
        let mut bookmarks: Vec<&Bookmark> = data
            .bookmarks
            .iter()
            .filter(|b| b.category_id == category.id)
            .collect();
        if bookmarks.is_empty() {
            continue;
        }
        bookmarks.sort_by_key(|b| b.order);

        html.push_str(&format!(
            "    <DT><H3 ADD_DATE=\"{0}\" LAST_MODIFIED=\"{0}\">{1}</H3>\n",
            now_secs,
            escape_html(&category.name)
        ));
        html.push_str("    <DL><p>\n");

        for bookmark in bookmarks {
            html.push_str(&format!(
                "        <DT><A HREF=\"{}\" ADD_DATE=\"{}\" LAST_MODIFIED=\"{}\" ICON=\"{}\">{}</A>\n",
                escape_html(&bookmark.url),
                epoch_secs(&bookmark.created_at, now_secs),
                epoch_secs(&bookmark.updated_at, now_secs),
                escape_html(bookmark.icon_url.as_deref().unwrap_or_default()),
                escape_html(&bookmark.title)
            ));
            if let Some(description) = bookmark.description.as_deref().filter(|d| !d.is_empty()) {
                html.push_str(&format!("        <DD>{}\n", escape_html(description)));
            }
        }

        html.push_str("    </DL><p>\n");
    }

    html.push_str("</DL><p>\n");
    html.push_str("</DL><p>\n");
    html
}

/// Download name such as `nav-bookmarks-20240131.json`.
pub fn file_name(format: ExportFormat, day: NaiveDate) -> String {
    format!(
        "nav-bookmarks-{}.{}",
        day.format("%Y%m%d"),
        format.extension()
    )
}

fn epoch_secs(timestamp: &str, fallback: i64) -> i64 {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.timestamp())
        .unwrap_or(fallback)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
