//! API-key authentication for the management routes.
//!
//! Implements constant-time comparison to mitigate timing attacks.

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;

use crate::errors::{codes, ErrorResponse};

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authentication layer function that takes the expected key as a parameter.
pub async fn api_key_auth_layer(
    expected_key: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    if is_authorized(request.headers(), expected_key.as_deref()) {
        next.run(request).await
    } else {
        unauthorized_response("Missing or invalid API key")
    }
}

/// Check the `x-api-key` header, then the bearer token, against `expected`.
///
/// With no key configured every request is allowed (dev mode).
pub fn is_authorized(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return true;
    };

    if let Some(provided) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return constant_time_compare(provided, expected);
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .is_some_and(|bearer| constant_time_compare(bearer, expected))
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Create an unauthorized response.
pub fn unauthorized_response(message: &str) -> Response {
    let body = ErrorResponse::new(codes::UNAUTHORIZED, message);
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
