use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cirrus_core::{ErrorCode, ProvisionError};
use serde_json::json;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// Invalid input (400)
    InvalidArgument(String),

    /// Resource not found (404)
    NotFound(String),

    /// Resource already exists with different attributes (409)
    AlreadyExists(String),

    /// Request cancelled before it completed (503)
    Cancelled(String),

    /// Backend or local failure (500)
    Internal(String),
}

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            ApiError::NotFound(_) => ErrorCode::NotFound,
            ApiError::AlreadyExists(_) => ErrorCode::AlreadyExists,
            ApiError::Cancelled(_) => ErrorCode::Cancelled,
            ApiError::Internal(_) => ErrorCode::Unknown,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyExists(_) => StatusCode::CONFLICT,
            ApiError::Cancelled(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_message(self) -> String {
        match self {
            ApiError::InvalidArgument(msg)
            | ApiError::NotFound(msg)
            | ApiError::AlreadyExists(msg)
            | ApiError::Cancelled(msg)
            | ApiError::Internal(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = Json(json!({
            "code": code,
            "message": self.into_message(),
        }));

        (status, body).into_response()
    }
}

impl From<ProvisionError> for ApiError {
    fn from(err: ProvisionError) -> Self {
        let message = err.to_string();
        match err.code() {
            ErrorCode::InvalidArgument => ApiError::InvalidArgument(message),
            ErrorCode::NotFound => ApiError::NotFound(message),
            ErrorCode::AlreadyExists => ApiError::AlreadyExists(message),
            ErrorCode::Cancelled => ApiError::Cancelled(message),
            ErrorCode::Unknown => ApiError::Internal(message),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::InvalidArgument(format!("JSON error: {}", err.body_text()))
    }
}
