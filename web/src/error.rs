//! Error types for web handlers.
//!
//! [`AppError`] bridges domain errors and HTTP responses. Validation failures
//! and claim conflicts carry their message to the client; storage failures
//! answer with a generic message and log the detail.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use carol_reservations_core::{ReservationError, StorageError};
use serde::Serialize;
use std::fmt;

/// Message returned when a reservation has per-carol problems.
pub const CONFLICTS_MESSAGE: &str = "Some carols could not be selected";

/// Application error type for web handlers.
///
/// Implements axum's `IntoResponse`, so handlers can return
/// `Result<_, AppError>` and use `?` on service calls.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>) -> Result<Json<Vec<CatalogItem>>, AppError> {
///     let carols = state.service.catalog().await?;
///     Ok(Json(carols))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Individual reasons, one per failed item
    errors: Vec<String>,
    /// Internal error (for logging, not exposed to client)
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
            errors: Vec::new(),
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Attach per-item reasons.
    #[must_use]
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
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

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
    /// Per-item reasons, omitted when empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log internal errors
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            errors: self.errors,
        };

        (self.status, Json(body)).into_response()
    }
}

/// Storage detail never reaches the client.
impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let base = match err {
            StorageError::Serialization(_) => Self::internal("Internal server error"),
            StorageError::Database(_) | StorageError::Io(_) | StorageError::Unavailable(_) => {
                Self::unavailable("Storage is temporarily unavailable. Please try again.")
            }
        };
        base.with_source(anyhow::Error::new(err))
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::Validation(e) => Self::bad_request(e.to_string()),
            ReservationError::Conflicts(problems) => Self::conflict(CONFLICTS_MESSAGE)
                .with_errors(problems.iter().map(ToString::to_string).collect()),
            ReservationError::Storage(e) => e.into(),
        }
    }
}
