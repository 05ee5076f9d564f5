//! Error types for the tracker API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by API handlers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Caller's role may not perform the action
    #[error("Forbidden")]
    Forbidden,

    /// No sheet exists for the manager
    #[error("Manager not found: {0}")]
    ManagerNotFound(String),

    /// Request body or parameters are invalid
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A sheet already exists for the manager
    #[error("Manager already exists: {0}")]
    ManagerExists(String),
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::ManagerNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ManagerExists(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
