//! Request id and sensitive header layers

use axum::http::HeaderName;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
};

use crate::config::MiddlewareConfig;

/// Headers masked in traces and logs
pub const SENSITIVE_HEADERS: &[HeaderName] = &[
    axum::http::header::AUTHORIZATION,
    axum::http::header::COOKIE,
    axum::http::header::SET_COOKIE,
];

const DEFAULT_REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Configured request id header, falling back to `x-request-id`
pub fn request_id_header(config: &MiddlewareConfig) -> HeaderName {
    HeaderName::try_from(config.request_id_header.as_str()).unwrap_or_else(|_| {
        tracing::warn!(
            header = %config.request_id_header,
            "Invalid request id header name, using x-request-id"
        );
        DEFAULT_REQUEST_ID_HEADER
    })
}

/// Assign a UUID v4 request id when the client did not send one
pub fn request_id_layer(config: &MiddlewareConfig) -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(request_id_header(config), MakeRequestUuid)
}

/// Copy the request id onto the response
pub fn request_id_propagation_layer(config: &MiddlewareConfig) -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(request_id_header(config))
}

pub fn sensitive_headers_layer() -> SetSensitiveRequestHeadersLayer {
    SetSensitiveRequestHeadersLayer::new(SENSITIVE_HEADERS.iter().cloned())
}
