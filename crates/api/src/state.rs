use std::sync::Arc;

use gatehouse_db::store::{CredentialStore, SessionStore};

use crate::auth::error::AuthResult;
use crate::auth::jwt::TokenIssuer;
use crate::auth::service::AuthService;
use crate::auth::session::SessionTracker;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Register/login/logout/refresh flows and the session tracker.
    pub auth: Arc<AuthService>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire the auth flows to the given stores using `config`.
    pub fn new(
        config: ServerConfig,
        users: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> AuthResult<Self> {
        let tracker = SessionTracker::new(sessions, config.session.clone());
        let tokens = TokenIssuer::new(&config.jwt);
        let auth = AuthService::new(users, tracker, tokens, config.hashing.clone())?;

        Ok(Self {
            auth: Arc::new(auth),
            config: Arc::new(config),
        })
    }
}
