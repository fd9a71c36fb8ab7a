//! Repository for the `sessions` table.

use gatehouse_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::session::{CreateSession, Session};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, access_token, expires_at, created_at, updated_at";

/// Provides CRUD operations for server-side sessions.
///
/// Every mutation takes the new idle horizon so a write also extends the
/// session. Mutations only match live (unexpired) rows.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new, unauthenticated session, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateSession) -> Result<Session, sqlx::Error> {
        let query = format!(
            "INSERT INTO sessions (id, expires_at)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(&input.id)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find a session that has not yet expired.
    pub async fn find_active(pool: &PgPool, id: &str) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE id = $1 AND expires_at > NOW()");
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Push a live session's idle horizon forward, returning the updated row.
    pub async fn touch(
        pool: &PgPool,
        id: &str,
        expires_at: Timestamp,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET expires_at = $2, updated_at = NOW()
             WHERE id = $1 AND expires_at > NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .bind(expires_at)
            .fetch_optional(pool)
            .await
    }

    /// Bind a session to a user and its current access token.
    ///
    /// Returns `true` if the row was updated.
    pub async fn set_auth(
        pool: &PgPool,
        id: &str,
        user_id: DbId,
        access_token: &str,
        expires_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions SET user_id = $2, access_token = $3, expires_at = $4, updated_at = NOW()
             WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(id)
        .bind(user_id)
        .bind(access_token)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace (or clear, with `None`) the access token, keeping `user_id`.
    ///
    /// Returns `true` if the row was updated.
    pub async fn set_access_token(
        pool: &PgPool,
        id: &str,
        access_token: Option<&str>,
        expires_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions SET access_token = $2, expires_at = $3, updated_at = NOW()
             WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(id)
        .bind(access_token)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete expired sessions. Returns the count of deleted rows.
    pub async fn cleanup_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
