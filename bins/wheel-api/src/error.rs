//! Error types for the prize wheel service.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Service domain error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Expected, user-facing outcomes
    #[error("init data validation failed: {0}")]
    Validation(#[from] wheel_initdata::Error),

    #[error("authentication required")]
    Unauthorized,

    #[error("phone number required")]
    PhoneRequired,

    #[error("spin limit exceeded")]
    QuotaExceeded,

    #[error("bad request: {0}")]
    BadRequest(String),

    // Configuration / infrastructure errors
    #[error("no prizes eligible for random draw")]
    NoEligiblePrizes,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Error code string for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::PhoneRequired => "PHONE_REQUIRED",
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::BadRequest(_) => "BAD_REQUEST",
            // Misconfiguration and storage failures surface as one
            // opaque code; the distinction lives in the server log.
            Self::NoEligiblePrizes | Self::Database(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 401 Unauthorized - payload not trusted
            Self::Validation(_) | Self::Unauthorized => StatusCode::UNAUTHORIZED,

            // 403 Forbidden - authenticated but not phone-verified
            Self::PhoneRequired => StatusCode::FORBIDDEN,

            // 409 Conflict - quota already consumed, expected outcome
            Self::QuotaExceeded => StatusCode::CONFLICT,

            // 400 Bad Request
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,

            // 500 Internal Server Error
            Self::NoEligiblePrizes | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// User-visible message. Internal failures are flattened so no
    /// storage or catalog detail leaks through the response body.
    fn public_message(&self) -> String {
        match self {
            Self::QuotaExceeded => "Вы уже использовали свой спин".to_string(),
            Self::PhoneRequired => "Сначала поделитесь номером телефона в боте".to_string(),
            Self::NoEligiblePrizes | Self::Database(_) | Self::Internal(_) => {
                "internal error".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail within response.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.public_message(),
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ApiError>;
