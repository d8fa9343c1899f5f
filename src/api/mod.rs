//! REST API module.
//!
//! Every mutating handler reads the current dataset, edits it in memory and
//! persists it through the dataset store.

mod backups;
mod bookmarks;
mod categories;
mod organize;
mod transfer;

pub use backups::*;
pub use bookmarks::*;
pub use categories::*;
pub use organize::*;
pub use transfer::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    /// Dataset version after the request
    pub version: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, version: i64) -> Self {
        Self {
            success: true,
            data,
            version,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::errors::AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, version: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, version))
}

/// Reject blank required text fields.
fn require_text(value: &str, field: &str) -> Result<(), crate::errors::AppError> {
    if value.trim().is_empty() {
        return Err(crate::errors::AppError::Validation(format!(
            "{} is required",
            field
        )));
    }
    Ok(())
}

/// Treat empty optional strings as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
