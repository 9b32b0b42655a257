//! Rich error handling for the balance engine.
//!
//! Structured errors with a stable code, a human-readable message, and
//! key-value context, mapped to HTTP status codes at the API boundary.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::BackendError;
use crate::reconciliation::ReconciliationError;

/// Error codes for the balance engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Invalid request format or missing fields.
    InvalidRequest,
    /// Missing or bad admin credentials.
    Unauthorized,
    /// Rate limit exceeded.
    RateLimited,
    /// Booking or log row not found.
    NotFound,
    /// The hosted database collaborator is unreachable or failing.
    BackendUnavailable,
    /// Unexpected server error.
    InternalError,
}

impl ErrorCode {
    /// HTTP status code for this error.
    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BackendUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable reason string for API payloads.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::RateLimited => "RATE_LIMITED",
            Self::NotFound => "NOT_FOUND",
            Self::BackendUnavailable => "BACKEND_UNAVAILABLE",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// A rich error with context for the balance engine.
#[derive(Debug, Error)]
pub struct EngineError {
    /// Error code.
    code: ErrorCode,
    /// Human-readable message.
    message: String,
    /// Additional context (key-value pairs).
    context: Vec<(String, String)>,
}

impl EngineError {
    /// Create a new engine error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    /// Add context to the error.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the context.
    #[must_use]
    pub fn context(&self) -> &[(String, String)] {
        &self.context
    }

    /// Convert to an HTTP-compatible error response body.
    #[must_use]
    pub fn to_http_response(&self) -> HttpErrorResponse {
        HttpErrorResponse {
            code: self.code.reason().to_string(),
            message: self.message.clone(),
            details: self.context.iter().cloned().collect(),
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.reason(), self.message)
    }
}

/// HTTP-compatible error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpErrorResponse {
    /// Error code string.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Additional details.
    pub details: std::collections::HashMap<String, String>,
}

/// Convenience constructors for common errors.
impl EngineError {
    /// Invalid request format.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Missing or bad admin credentials.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::Unauthorized, "Admin authentication required")
    }

    /// Rate limit exceeded.
    #[must_use]
    pub fn rate_limited() -> Self {
        Self::new(ErrorCode::RateLimited, "Too many requests")
    }

    /// Internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl From<BackendError> for EngineError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound => Self::new(ErrorCode::NotFound, "Booking not found"),
            BackendError::Transient(message) => {
                Self::new(ErrorCode::BackendUnavailable, message)
            }
            BackendError::Rejected { code, message } => {
                Self::new(ErrorCode::InternalError, message).with_context("backend_code", code)
            }
            BackendError::Decode(message) => Self::new(ErrorCode::InternalError, message)
                .with_context("kind", "decode"),
        }
    }
}

impl From<ReconciliationError> for EngineError {
    fn from(err: ReconciliationError) -> Self {
        match err {
            ReconciliationError::ListBookings(inner) => {
                Self::from(inner).with_context("phase", "list_bookings")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_mapping() {
        assert_eq!(ErrorCode::InvalidRequest.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Unauthorized.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ErrorCode::RateLimited.http_status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ErrorCode::BackendUnavailable.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_engine_error_creation() {
        let error = EngineError::new(ErrorCode::InvalidRequest, "Bad request")
            .with_context("field", "minDiscrepancy")
            .with_context("value", "-1");

        assert_eq!(error.code(), ErrorCode::InvalidRequest);
        assert_eq!(error.message(), "Bad request");
        assert_eq!(error.context().len(), 2);
    }

    #[test]
    fn test_to_http_response() {
        let error = EngineError::invalid_request("Limit out of range")
            .with_context("field", "limit");
        let response = error.to_http_response();

        assert_eq!(response.code, "INVALID_REQUEST");
        assert!(response.details.contains_key("field"));
    }

    #[test]
    fn test_error_display() {
        let error = EngineError::unauthorized();
        assert_eq!(
            error.to_string(),
            "[UNAUTHORIZED] Admin authentication required"
        );
    }

    #[test]
    fn test_backend_error_conversion() {
        let error: EngineError = BackendError::Transient("connect timeout".to_string()).into();
        assert_eq!(error.code(), ErrorCode::BackendUnavailable);

        let error: EngineError = BackendError::NotFound.into();
        assert_eq!(error.code(), ErrorCode::NotFound);
    }
}
