//! Server-side session model and DTOs.

use gatehouse_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A session row from the `sessions` table, keyed by the cookie value.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: String,
    /// Authenticated user, if any. Lookup only; the session does not own the user.
    pub user_id: Option<DbId>,
    pub access_token: Option<String>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Session {
    /// Whether the idle horizon has passed at `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

/// DTO for creating a new, unauthenticated session.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub id: String,
    pub expires_at: Timestamp,
}
