//! Error types for web handlers.
//!
//! Bridges domain errors to HTTP responses via Axum's `IntoResponse`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cartstream_core::{EventLogError, ProjectionError};
use cartstream_checkout::CheckoutError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// Wraps domain errors and renders them as JSON error responses with an
/// appropriate status code.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: String,
    /// Internal error for logging, not exposed to the client.
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Attach the underlying error for server-side logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            message.into(),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message.into(), "CONFLICT".to_string())
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// The HTTP status this error renders as.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::AddToCheckedOut
            | CheckoutError::RemoveFromCheckedOut
            | CheckoutError::AlreadyCheckedOut
            | CheckoutError::NoEvents
            | CheckoutError::UnknownEventType
            | CheckoutError::InvalidItemId => Self::bad_request(err.to_string()),
            CheckoutError::NotFound(cart_id) => {
                Self::not_found(format!("cart {cart_id} not found"))
            }
            CheckoutError::Log(log_err) => log_err.into(),
        }
    }
}

impl From<EventLogError> for AppError {
    fn from(err: EventLogError) -> Self {
        match err {
            EventLogError::Conflict { .. } => Self::conflict(err.to_string()),
            EventLogError::InvalidEvent(_) | EventLogError::EmptyTypeFilter => {
                Self::bad_request(err.to_string())
            }
            EventLogError::Database(_) | EventLogError::Serialization(_) => {
                Self::internal("event log unavailable").with_source(err.into())
            }
        }
    }
}

impl From<ProjectionError> for AppError {
    fn from(err: ProjectionError) -> Self {
        Self::internal("read model unavailable").with_source(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_rules_map_to_bad_request() {
        let err = AppError::from(CheckoutError::AddToCheckedOut);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "[BAD_REQUEST] cannot add items to a checked out cart"
        );
    }

    #[test]
    fn missing_cart_maps_to_not_found() {
        let err = AppError::from(CheckoutError::NotFound(7));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn version_conflict_maps_to_conflict() {
        let err = AppError::from(CheckoutError::Log(EventLogError::Conflict {
            aggregate_type: "cart".to_string(),
            aggregate_id: 7,
            version_id: 3,
        }));
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn storage_failure_maps_to_internal() {
        let err = AppError::from(EventLogError::Database("connection refused".to_string()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // The storage detail stays server-side.
        assert_eq!(err.to_string(), "[INTERNAL_SERVER_ERROR] event log unavailable");
    }
}
