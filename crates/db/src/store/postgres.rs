use async_trait::async_trait;
use gatehouse_core::types::{DbId, Timestamp};

use super::{CredentialStore, SessionStore, StoreError};
use crate::models::session::{CreateSession, Session};
use crate::models::user::{CreateUser, User};
use crate::repositories::{SessionRepo, UserRepo};
use crate::DbPool;

/// Unique constraint names from `db/migrations`.
const UQ_USERNAME: &str = "uq_users_username";
const UQ_EMAIL: &str = "uq_users_email";

/// PostgreSQL-backed store delegating to the repositories.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Map a unique violation (SQLSTATE 23505) on a users constraint to the
/// matching duplicate error. Everything else stays a database error.
fn classify_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            match db_err.constraint() {
                Some(UQ_USERNAME) => return StoreError::DuplicateUsername,
                Some(UQ_EMAIL) => return StoreError::DuplicateEmail,
                other => {
                    tracing::warn!(constraint = ?other, "Unique violation on unexpected constraint")
                }
            }
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn create_user(&self, input: &CreateUser) -> Result<User, StoreError> {
        UserRepo::create(&self.pool, input)
            .await
            .map_err(classify_insert_error)
    }

    async fn find_user(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_username(&self.pool, username).await?)
    }

    async fn set_refresh_token(&self, id: DbId, token: Option<&str>) -> Result<bool, StoreError> {
        Ok(UserRepo::set_refresh_token(&self.pool, id, token).await?)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(&self, input: &CreateSession) -> Result<Session, StoreError> {
        Ok(SessionRepo::create(&self.pool, input).await?)
    }

    async fn find_active_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        Ok(SessionRepo::find_active(&self.pool, id).await?)
    }

    async fn touch_session(
        &self,
        id: &str,
        expires_at: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        Ok(SessionRepo::touch(&self.pool, id, expires_at).await?)
    }

    async fn set_session_auth(
        &self,
        id: &str,
        user_id: DbId,
        access_token: &str,
        expires_at: Timestamp,
    ) -> Result<bool, StoreError> {
        Ok(SessionRepo::set_auth(&self.pool, id, user_id, access_token, expires_at).await?)
    }

    async fn set_session_access_token(
        &self,
        id: &str,
        access_token: Option<&str>,
        expires_at: Timestamp,
    ) -> Result<bool, StoreError> {
        Ok(SessionRepo::set_access_token(&self.pool, id, access_token, expires_at).await?)
    }

    async fn cleanup_expired_sessions(&self) -> Result<u64, StoreError> {
        Ok(SessionRepo::cleanup_expired(&self.pool).await?)
    }
}
