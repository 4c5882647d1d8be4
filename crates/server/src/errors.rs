use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use service::auth::AuthError;
use thiserror::Error;
use tracing::{error, warn};

use crate::observability;

/// HTTP-facing error: a status code and a client-safe message rendered as
/// `{"message": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({"message": self.message}))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        observability::AUTH_ERRORS_TOTAL.with_label_values(&[e.kind()]).inc();
        match e {
            AuthError::Validation(msg) => ApiError::bad_request(msg),
            AuthError::Conflict => ApiError::bad_request("user already exists"),
            AuthError::NotFound => ApiError::new(StatusCode::NOT_FOUND, "user not found"),
            AuthError::InvalidCredential => ApiError::bad_request("invalid password"),
            AuthError::InvalidToken => ApiError::unauthorized("invalid token"),
            internal => {
                error!(code = internal.code(), error = %internal, "request failed");
                ApiError::internal()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected request body");
        ApiError::bad_request(rejection.body_text())
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
