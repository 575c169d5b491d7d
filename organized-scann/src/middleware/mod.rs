//! HTTP middleware shared by every route
//!
//! - Request id generation and propagation
//! - Sensitive header masking in traces
//! - CORS policy from configuration
//! - Panic recovery with the uniform JSON error body
//! - JSON bodies for the 408/413 responses produced by tower-http layers

mod request_tracking;

pub use request_tracking::{
    request_id_header, request_id_layer, request_id_propagation_layer, sensitive_headers_layer,
    SENSITIVE_HEADERS,
};

use std::any::Any;

use axum::{
    http::{header, StatusCode},
    response::Response,
};
use tower_http::cors::CorsLayer;

use crate::config::MiddlewareConfig;
use crate::error::ErrorResponse;

/// CORS layer for the configured mode (`permissive`, `restrictive`, `disabled`)
pub fn cors_layer(config: &MiddlewareConfig) -> CorsLayer {
    match config.cors_mode.as_str() {
        "permissive" => CorsLayer::permissive(),
        "restrictive" | "disabled" => CorsLayer::new(),
        other => {
            tracing::warn!(mode = other, "Unknown CORS mode, defaulting to permissive");
            CorsLayer::permissive()
        }
    }
}

/// Render a panic as a 500 with the standard error body
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!(detail, "Handler panicked");

    ErrorResponse::with_code(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "Internal server error",
    )
    .into_http()
}

/// Replace the plain-text bodies of layer-generated 408 and 413 responses
/// with the standard error body
pub async fn json_error_body(response: Response) -> Response {
    let (code, message) = match response.status() {
        StatusCode::REQUEST_TIMEOUT => ("REQUEST_TIMEOUT", "Request timed out"),
        StatusCode::PAYLOAD_TOO_LARGE => ("PAYLOAD_TOO_LARGE", "Request body is too large"),
        _ => return response,
    };

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));
    if is_json {
        return response;
    }

    ErrorResponse::with_code(response.status(), code, message).into_http()
}
