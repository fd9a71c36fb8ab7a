use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use gatehouse_core::types::{DbId, Timestamp};
use tokio::sync::RwLock;

use super::{CredentialStore, SessionStore, StoreError};
use crate::models::session::{CreateSession, Session};
use crate::models::user::{CreateUser, User};

#[derive(Default)]
struct UserTable {
    last_id: DbId,
    rows: HashMap<DbId, User>,
}

/// In-process store. Uniqueness checks and the insert happen under one
/// write lock, matching the guarantee of the database constraints.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<UserTable>,
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_user(&self, input: &CreateUser) -> Result<User, StoreError> {
        let mut table = self.users.write().await;

        if table.rows.values().any(|u| u.username == input.username) {
            return Err(StoreError::DuplicateUsername);
        }
        if table.rows.values().any(|u| u.email == input.email) {
            return Err(StoreError::DuplicateEmail);
        }

        table.last_id += 1;
        let now = Utc::now();
        let user = User {
            id: table.last_id,
            username: input.username.clone(),
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.rows.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let table = self.users.read().await;
        Ok(table.rows.values().find(|u| u.username == username).cloned())
    }

    async fn set_refresh_token(&self, id: DbId, token: Option<&str>) -> Result<bool, StoreError> {
        let mut table = self.users.write().await;
        match table.rows.get_mut(&id) {
            Some(user) => {
                user.refresh_token = token.map(str::to_string);
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Run `f` on the session if it exists and is still live.
async fn with_live_session<T>(
    sessions: &RwLock<HashMap<String, Session>>,
    id: &str,
    f: impl FnOnce(&mut Session) -> T,
) -> Option<T> {
    let mut sessions = sessions.write().await;
    let now = Utc::now();
    match sessions.get_mut(id) {
        Some(session) if !session.is_expired_at(now) => {
            let out = f(session);
            session.updated_at = now;
            Some(out)
        }
        _ => None,
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, input: &CreateSession) -> Result<Session, StoreError> {
        let now = Utc::now();
        let session = Session {
            id: input.id.clone(),
            user_id: None,
            access_token: None,
            expires_at: input.expires_at,
            created_at: now,
            updated_at: now,
        };
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn find_active_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        let now = Utc::now();
        Ok(sessions
            .get(id)
            .filter(|s| !s.is_expired_at(now))
            .cloned())
    }

    async fn touch_session(
        &self,
        id: &str,
        expires_at: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        Ok(with_live_session(&self.sessions, id, |s| {
            s.expires_at = expires_at;
            s.clone()
        })
        .await)
    }

    async fn set_session_auth(
        &self,
        id: &str,
        user_id: DbId,
        access_token: &str,
        expires_at: Timestamp,
    ) -> Result<bool, StoreError> {
        let updated = with_live_session(&self.sessions, id, |s| {
            s.user_id = Some(user_id);
            s.access_token = Some(access_token.to_string());
            s.expires_at = expires_at;
        })
        .await;
        Ok(updated.is_some())
    }

    async fn set_session_access_token(
        &self,
        id: &str,
        access_token: Option<&str>,
        expires_at: Timestamp,
    ) -> Result<bool, StoreError> {
        let updated = with_live_session(&self.sessions, id, |s| {
            s.access_token = access_token.map(str::to_string);
            s.expires_at = expires_at;
        })
        .await;
        Ok(updated.is_some())
    }

    async fn cleanup_expired_sessions(&self) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        Ok((before - sessions.len()) as u64)
    }
}
