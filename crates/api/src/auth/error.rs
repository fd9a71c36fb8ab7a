//! Error taxonomy for the credential and session flows.

use gatehouse_core::validation::ValidationFailure;
use gatehouse_db::store::StoreError;

/// Every terminal outcome of an auth flow other than success.
///
/// None of these are retried; the HTTP layer maps each one to a status in
/// [`AppError`](crate::error::AppError).
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Payload failed schema checks. Reported before any store or hash work.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    #[error("Username is already taken")]
    DuplicateUsername,

    #[error("Email is already registered")]
    DuplicateEmail,

    /// Unknown username and wrong password both produce this variant.
    #[error("Wrong username/password")]
    InvalidCredentials,

    /// The session is missing, expired, or not bound to an existing user.
    #[error("User not found for this session")]
    SessionNotFound,

    #[error("No refresh token on record")]
    NoRefreshToken,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Access denied")]
    MissingAccessToken,

    #[error("Invalid token")]
    InvalidAccessToken,

    #[error("Token expired")]
    Expired,

    #[error(transparent)]
    Store(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername => Self::DuplicateUsername,
            StoreError::DuplicateEmail => Self::DuplicateEmail,
            other => Self::Store(other),
        }
    }
}

/// Result alias for the auth flows.
pub type AuthResult<T> = Result<T, AuthError>;
