//! Register, login, logout, and refresh flows.
//!
//! [`AuthService`] owns the credential store handle, the session tracker, and
//! the token issuer. Every flow validates its payload before touching the
//! store or the hasher, and reports failures as [`AuthError`].

use std::sync::Arc;

use gatehouse_core::types::DbId;
use gatehouse_core::validation::{LoginInput, RegisterInput};
use gatehouse_db::models::user::{CreateUser, User};
use gatehouse_db::store::CredentialStore;

use crate::auth::error::{AuthError, AuthResult};
use crate::auth::jwt::{AccessClaims, RefreshSubject, TokenIssuer};
use crate::auth::password::{hash_password, verify_password, HashingConfig};
use crate::auth::session::SessionTracker;

/// Plaintext hashed once at startup; unknown usernames are verified against it.
const DUMMY_PASSWORD: &str = "gatehouse-timing-equalizer";

pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    sessions: SessionTracker,
    tokens: TokenIssuer,
    hashing: HashingConfig,
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        sessions: SessionTracker,
        tokens: TokenIssuer,
        hashing: HashingConfig,
    ) -> AuthResult<Self> {
        let dummy_hash = hash_password(DUMMY_PASSWORD, &hashing)
            .map_err(|e| AuthError::internal(format!("Password hashing error: {e}")))?;

        Ok(Self {
            users,
            sessions,
            tokens,
            hashing,
            dummy_hash,
        })
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub async fn health_check(&self) -> AuthResult<()> {
        Ok(self.users.health_check().await?)
    }

    /// Create an account. Does not log the new user in.
    pub async fn register(&self, input: RegisterInput) -> AuthResult<User> {
        let registration = input.into_registration()?;
        let password_hash = self.hash(registration.password).await?;

        let user = self
            .users
            .create_user(&CreateUser {
                username: registration.username,
                email: registration.email,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Check credentials, bind the session to the user, and store a fresh
    /// refresh token on the user record.
    pub async fn login(&self, session_id: &str, input: LoginInput) -> AuthResult<User> {
        let credentials = input.into_credentials()?;

        let found = self
            .users
            .find_user_by_username(&credentials.username)
            .await?;
        let stored_hash = match &found {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_hash.clone(),
        };
        let matched = self.verify(credentials.password, stored_hash).await?;

        let mut user = match found {
            Some(user) if matched => user,
            _ => {
                tracing::info!(username = %credentials.username, "Login rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let access_token = self.tokens.issue_access(user.id)?;
        let refresh_token = self.tokens.issue_refresh(user.id)?;

        self.sessions
            .set_auth(session_id, user.id, &access_token)
            .await?;
        self.store_refresh_token(user.id, Some(&refresh_token))
            .await?;
        user.refresh_token = Some(refresh_token);

        tracing::info!(user_id = user.id, "User logged in");
        Ok(user)
    }

    /// Revoke the user's refresh token and drop the session's access token.
    pub async fn logout(&self, session_id: &str) -> AuthResult<()> {
        let user = self.session_user(session_id).await?;

        self.store_refresh_token(user.id, None).await?;
        self.sessions.clear_auth(session_id).await?;

        tracing::info!(user_id = user.id, "User logged out");
        Ok(())
    }

    /// Issue a new access token from the refresh token stored on the
    /// session's user. A refresh token presented by the client must match the
    /// stored one exactly.
    pub async fn refresh_access_token(
        &self,
        session_id: &str,
        presented: Option<&str>,
    ) -> AuthResult<String> {
        let user = self.session_user(session_id).await?;
        let stored = user
            .refresh_token
            .as_deref()
            .ok_or(AuthError::NoRefreshToken)?;

        if presented.is_some_and(|token| token != stored) {
            tracing::warn!(user_id = user.id, "Presented refresh token does not match");
            return Err(AuthError::InvalidRefreshToken);
        }

        let claims = self.tokens.verify_refresh(stored)?;
        let subject = match self.tokens.refresh_subject() {
            RefreshSubject::RefreshToken => claims.sub,
            RefreshSubject::StoredUser => user.id,
        };

        let access_token = self.tokens.issue_access(subject)?;
        self.sessions
            .set_access_token(session_id, &access_token)
            .await?;

        tracing::debug!(user_id = user.id, subject, "Access token refreshed");
        Ok(access_token)
    }

    /// Verify the access token held by the session.
    pub async fn authorize(&self, session_id: &str) -> AuthResult<AccessClaims> {
        let token = self
            .sessions
            .access_token(session_id)
            .await?
            .ok_or(AuthError::MissingAccessToken)?;
        self.tokens.verify_access(&token)
    }

    /// The user the session is bound to. A session without a user, or bound
    /// to a user that no longer exists, is `SessionNotFound`.
    async fn session_user(&self, session_id: &str) -> AuthResult<User> {
        let user_id = self
            .sessions
            .resolve_user(session_id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;
        self.users
            .find_user(user_id)
            .await?
            .ok_or(AuthError::SessionNotFound)
    }

    async fn store_refresh_token(&self, user_id: DbId, token: Option<&str>) -> AuthResult<()> {
        if self.users.set_refresh_token(user_id, token).await? {
            Ok(())
        } else {
            Err(AuthError::SessionNotFound)
        }
    }

    async fn hash(&self, password: String) -> AuthResult<String> {
        let hashing = self.hashing.clone();
        tokio::task::spawn_blocking(move || hash_password(&password, &hashing))
            .await
            .map_err(|e| AuthError::internal(format!("Hashing task failed: {e}")))?
            .map_err(|e| AuthError::internal(format!("Password hashing error: {e}")))
    }

    async fn verify(&self, password: String, hash: String) -> AuthResult<bool> {
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::internal(format!("Verification task failed: {e}")))?
            .map_err(|e| AuthError::internal(format!("Password verification error: {e}")))
    }
}
