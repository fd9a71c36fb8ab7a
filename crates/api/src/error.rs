use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gatehouse_db::store::StoreError;
use serde_json::json;

use crate::auth::error::AuthError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`AuthError`] for the credential and session flows and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce consistent
/// JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// An outcome of one of the auth flows.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Auth(err.into())
    }
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Auth(auth) => classify_auth_error(auth),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    INTERNAL_MESSAGE.to_string(),
                )
            }
        };

        let body = match &self {
            AppError::Auth(AuthError::Validation(failure)) => json!({
                "error": message,
                "code": code,
                "details": failure.violations,
            }),
            _ => json!({
                "error": message,
                "code": code,
            }),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Map an [`AuthError`] to an HTTP status, error code, and message.
///
/// Validation failures are 422; business rejections are 400, except an
/// invalid refresh token (403) and a missing access token (401).
/// Infrastructure failures are 500 with a sanitized message.
fn classify_auth_error(err: &AuthError) -> (StatusCode, &'static str, String) {
    let status_code = match err {
        AuthError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
        AuthError::DuplicateUsername => (StatusCode::BAD_REQUEST, "DUPLICATE_USERNAME"),
        AuthError::DuplicateEmail => (StatusCode::BAD_REQUEST, "DUPLICATE_EMAIL"),
        AuthError::InvalidCredentials => (StatusCode::BAD_REQUEST, "INVALID_CREDENTIALS"),
        AuthError::SessionNotFound => (StatusCode::BAD_REQUEST, "SESSION_NOT_FOUND"),
        AuthError::NoRefreshToken => (StatusCode::BAD_REQUEST, "NO_REFRESH_TOKEN"),
        AuthError::InvalidRefreshToken => (StatusCode::FORBIDDEN, "INVALID_REFRESH_TOKEN"),
        AuthError::MissingAccessToken => (StatusCode::UNAUTHORIZED, "ACCESS_DENIED"),
        AuthError::InvalidAccessToken => (StatusCode::BAD_REQUEST, "INVALID_TOKEN"),
        AuthError::Expired => (StatusCode::BAD_REQUEST, "TOKEN_EXPIRED"),
        AuthError::Store(store) => {
            tracing::error!(error = %store, "Store error");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                INTERNAL_MESSAGE.to_string(),
            );
        }
        AuthError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal auth error");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                INTERNAL_MESSAGE.to_string(),
            );
        }
    };

    let (status, code) = status_code;
    (status, code, err.to_string())
}
