//! Error types and HTTP response conversion
//!
//! [`Error`] is the single error boundary of the service: every handler,
//! extractor and gateway failure is turned into one of its variants and
//! rendered by its [`IntoResponse`] implementation.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::repository::{RepositoryError, RepositoryErrorKind};

/// Result type alias using the service error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the service
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Persistence gateway failure
    #[error("{0}")]
    Repository(RepositoryError),

    /// Database driver error outside of a repository call (pool setup, schema)
    #[error("Database error: {0}")]
    Database(Box<sqlx::Error>),

    /// JWT encoding error
    #[error("JWT error: {0}")]
    Jwt(Box<jsonwebtoken::errors::Error>),

    /// Password hashing error
    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or invalid credentials
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Authenticated identity lacks the required role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Duplicate unique key
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Request payload failed validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Request body exceeds the configured limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// A dependency is not reachable
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    /// Optional error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// HTTP status code
    pub status: u16,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
            status: status.as_u16(),
        }
    }

    /// Create error response with a code
    pub fn with_code(
        status: StatusCode,
        code: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
            status: status.as_u16(),
        }
    }

    /// Render this body with its status
    pub fn into_http(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl Error {
    /// HTTP status this error renders with
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Repository(e) => match e.kind {
                RepositoryErrorKind::NotFound => StatusCode::NOT_FOUND,
                RepositoryErrorKind::ConstraintViolation => StatusCode::BAD_REQUEST,
                RepositoryErrorKind::Unavailable | RepositoryErrorKind::Timeout => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::BadRequest(_) | Error::Conflict(_) | Error::ValidationError(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Config(_)
            | Error::Database(_)
            | Error::Jwt(_)
            | Error::PasswordHash(_)
            | Error::Io(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            // Missing records render as a bare 404
            Error::NotFound(_) => return status.into_response(),

            Error::Repository(ref e) => {
                if e.kind == RepositoryErrorKind::NotFound {
                    return status.into_response();
                }

                if status.is_server_error() {
                    tracing::error!(
                        operation = %e.operation,
                        kind = %e.kind,
                        entity_type = ?e.entity_type,
                        entity_id = ?e.entity_id,
                        "Repository error: {}", e.message
                    );
                }

                // Constraint messages are built by the gateway and name the
                // offending field; driver messages never reach the client
                let (code, message) = match e.kind {
                    RepositoryErrorKind::ConstraintViolation => ("CONFLICT", e.message.clone()),
                    RepositoryErrorKind::Unavailable | RepositoryErrorKind::Timeout => (
                        "SERVICE_UNAVAILABLE",
                        "Storage is temporarily unavailable".to_string(),
                    ),
                    _ => ("DATABASE_ERROR", "Database operation failed".to_string()),
                };
                ErrorResponse::with_code(status, code, message)
            }

            Error::Config(e) => {
                tracing::error!("Configuration error: {}", e);
                ErrorResponse::with_code(status, "CONFIG_ERROR", "Service misconfigured")
            }

            Error::Database(e) => {
                tracing::error!("Database error: {}", e);
                ErrorResponse::with_code(status, "DATABASE_ERROR", "Database operation failed")
            }

            Error::Jwt(e) => {
                tracing::error!("JWT error: {}", e);
                ErrorResponse::with_code(status, "TOKEN_ERROR", "Token could not be issued")
            }

            Error::PasswordHash(msg) => {
                tracing::error!("Password hashing error: {}", msg);
                ErrorResponse::with_code(status, "INTERNAL_ERROR", "Internal server error")
            }

            Error::Io(e) => {
                tracing::error!("I/O error: {}", e);
                ErrorResponse::with_code(status, "IO_ERROR", "I/O operation failed")
            }

            Error::Unauthorized(msg) => ErrorResponse::with_code(status, "UNAUTHORIZED", msg),
            Error::Forbidden(msg) => ErrorResponse::with_code(status, "FORBIDDEN", msg),
            Error::BadRequest(msg) => ErrorResponse::with_code(status, "BAD_REQUEST", msg),
            Error::Conflict(msg) => ErrorResponse::with_code(status, "CONFLICT", msg),
            Error::ValidationError(msg) => {
                ErrorResponse::with_code(status, "VALIDATION_ERROR", msg)
            }

            Error::PayloadTooLarge(msg) => {
                ErrorResponse::with_code(status, "PAYLOAD_TOO_LARGE", msg)
            }

            Error::Unavailable(msg) => {
                tracing::warn!("Dependency unavailable: {}", msg);
                ErrorResponse::with_code(status, "SERVICE_UNAVAILABLE", msg)
            }

            Error::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ErrorResponse::with_code(status, "INTERNAL_ERROR", "Internal server error")
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        Error::Repository(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Database(Box::new(err))
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error::Jwt(Box::new(err))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Error::ValidationError(describe_validation_errors(&errors))
    }
}

/// Flatten field validation failures into one readable message
fn describe_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, failures)| {
            let field: &str = field;
            failures.iter().map(move |failure| match (&failure.message, field) {
                // Struct-level checks are reported without a field prefix
                (Some(message), "__all__") => message.to_string(),
                (Some(message), _) => format!("{field}: {message}"),
                (None, _) => format!("{field}: invalid value ({})", failure.code),
            })
        })
        .collect();

    if messages.is_empty() {
        return "Request validation failed".to_string();
    }

    messages.sort();
    messages.join("; ")
}
