//! Storage traits the auth flows are written against.
//!
//! [`PgStore`] is the production backend; [`MemoryStore`] keeps everything
//! in process and is used by tests and local experiments. Both enforce
//! username/email uniqueness on insert, so callers never look-then-insert.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use gatehouse_core::types::{DbId, Timestamp};

use crate::models::session::{CreateSession, Session};
use crate::models::user::{CreateUser, User};

/// Errors surfaced by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Insert rejected by the username uniqueness constraint.
    #[error("Username is already taken")]
    DuplicateUsername,

    /// Insert rejected by the email uniqueness constraint.
    #[error("Email is already registered")]
    DuplicateEmail,

    /// Any other backend failure.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persists user records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a user. Duplicate username wins over duplicate email when
    /// both collide and the backend can tell them apart.
    async fn create_user(&self, input: &CreateUser) -> Result<User, StoreError>;

    async fn find_user(&self, id: DbId) -> Result<Option<User>, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Replace or clear the user's refresh token. Last write wins.
    async fn set_refresh_token(&self, id: DbId, token: Option<&str>) -> Result<bool, StoreError>;

    /// Confirm the backend is reachable.
    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Persists server-side sessions. Expired sessions are never returned and
/// never mutated.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, input: &CreateSession) -> Result<Session, StoreError>;

    async fn find_active_session(&self, id: &str) -> Result<Option<Session>, StoreError>;

    /// Extend a live session to `expires_at`, returning the updated row.
    async fn touch_session(
        &self,
        id: &str,
        expires_at: Timestamp,
    ) -> Result<Option<Session>, StoreError>;

    async fn set_session_auth(
        &self,
        id: &str,
        user_id: DbId,
        access_token: &str,
        expires_at: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Replace or clear the access token, leaving `user_id` untouched.
    async fn set_session_access_token(
        &self,
        id: &str,
        access_token: Option<&str>,
        expires_at: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Delete expired sessions, returning how many were removed.
    async fn cleanup_expired_sessions(&self) -> Result<u64, StoreError>;
}
