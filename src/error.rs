//! Monitor error types with HTTP status code mapping.
//!
//! [`MonitorError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! The collector loop never surfaces these to clients; it logs them and
//! carries on with the next poll.

use axum::extract::rejection::QueryRejection;
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid parameter: offset must be a positive integer"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see [`MonitorError::error_code`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Service error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                 |
/// |-----------|-----------------|-----------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request             |
/// | 2000–2999 | Empty result    | 404 Not Found               |
/// | 3000–3999 | Server/upstream | 500 / 502 / 503             |
/// | 4290      | Feed throttling | 429 Too Many Requests       |
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Request input failed validation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The request was valid but there is not enough history to answer it.
    #[error("no data: {0}")]
    NoData(String),

    /// The event feed could not be reached or answered with a failure.
    #[error("event feed unavailable: {0}")]
    FeedUnavailable(String),

    /// The event store failed or timed out.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The event feed signalled that the quota is exhausted.
    #[error("event feed rate limit exhausted; retry after {retry_after_secs} s")]
    RateLimited {
        /// Seconds until the quota resets.
        retry_after_secs: u64,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MonitorError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidParameter(_) => 1001,
            Self::NoData(_) => 2001,
            Self::Internal(_) => 3000,
            Self::StorageUnavailable(_) => 3001,
            Self::FeedUnavailable(_) => 3002,
            Self::RateLimited { .. } => 4290,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            Self::NoData(_) => StatusCode::NOT_FOUND,
            Self::FeedUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Malformed query strings are reported as [`MonitorError::InvalidParameter`]
/// so they share the structured error body.
impl From<QueryRejection> for MonitorError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidParameter(rejection.body_text())
    }
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        if let Self::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}
