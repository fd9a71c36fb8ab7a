//! Server-side sessions keyed by an opaque cookie id.
//!
//! A session is created for any request that arrives without a live session
//! cookie. Its idle horizon is pushed forward on every request and on every
//! mutation; once the horizon passes, the session is treated as absent and the
//! background sweeper removes it.

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use chrono::Utc;
use gatehouse_core::types::{DbId, Timestamp};
use gatehouse_db::models::session::{CreateSession, Session};
use gatehouse_db::store::SessionStore;
use rand::RngCore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::auth::error::{AuthError, AuthResult};
use crate::config::{ConfigError, EnvSource};

/// Random bytes per session id (hex-encoded to twice this length).
const SESSION_ID_BYTES: usize = 32;

/// Upper bound for `SESSION_IDLE_SECS` (one year).
const MAX_IDLE_TIMEOUT_SECS: i64 = 365 * 24 * 60 * 60;

/// Session cookie and expiry settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Cookie name (default: `gatehouse.sid`).
    pub cookie_name: String,
    /// Idle timeout in seconds (default: 3600).
    pub idle_timeout_secs: i64,
    /// Add the `Secure` attribute to the cookie.
    pub secure_cookie: bool,
    /// How often expired sessions are deleted (default: 600).
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "gatehouse.sid".to_string(),
            idle_timeout_secs: 3600,
            secure_cookie: false,
            sweep_interval_secs: 600,
        }
    }
}

impl SessionConfig {
    /// Load session settings.
    ///
    /// | Env Var                       | Default         |
    /// |-------------------------------|-----------------|
    /// | `SESSION_COOKIE_NAME`         | `gatehouse.sid` |
    /// | `SESSION_IDLE_SECS`           | `3600`          |
    /// | `SESSION_COOKIE_SECURE`       | `false`         |
    /// | `SESSION_SWEEP_INTERVAL_SECS` | `600`           |
    pub fn from_source(env: &EnvSource<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cookie_name = env
            .optional("SESSION_COOKIE_NAME")
            .unwrap_or(defaults.cookie_name);
        if !is_cookie_token(&cookie_name) {
            return Err(ConfigError::Invalid {
                key: "SESSION_COOKIE_NAME",
                value: cookie_name,
            });
        }

        let idle_timeout_secs: i64 =
            env.parsed_or("SESSION_IDLE_SECS", defaults.idle_timeout_secs)?;
        if !(1..=MAX_IDLE_TIMEOUT_SECS).contains(&idle_timeout_secs) {
            return Err(ConfigError::Invalid {
                key: "SESSION_IDLE_SECS",
                value: idle_timeout_secs.to_string(),
            });
        }

        let sweep_interval_secs: u64 =
            env.parsed_or("SESSION_SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs)?;
        if sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "SESSION_SWEEP_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            cookie_name,
            idle_timeout_secs,
            secure_cookie: env.parsed_or("SESSION_COOKIE_SECURE", defaults.secure_cookie)?,
            sweep_interval_secs,
        })
    }
}

/// RFC 6265 cookie-name characters.
fn is_cookie_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

/// Generate a fresh 256-bit session id, hex-encoded.
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Session operations over a [`SessionStore`], with the idle timeout applied.
#[derive(Clone)]
pub struct SessionTracker {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
}

impl SessionTracker {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn horizon(&self) -> AuthResult<Timestamp> {
        chrono::Duration::try_seconds(self.config.idle_timeout_secs)
            .and_then(|idle| Utc::now().checked_add_signed(idle))
            .ok_or_else(|| {
                AuthError::internal(format!(
                    "Session idle timeout out of range: {}s",
                    self.config.idle_timeout_secs
                ))
            })
    }

    /// Start an anonymous session.
    pub async fn create(&self) -> AuthResult<Session> {
        let input = CreateSession {
            id: generate_session_id(),
            expires_at: self.horizon()?,
        };
        Ok(self.store.create_session(&input).await?)
    }

    /// Return the live session `id` with its idle horizon extended.
    pub async fn resume(&self, id: &str) -> AuthResult<Option<Session>> {
        Ok(self.store.touch_session(id, self.horizon()?).await?)
    }

    /// Bind the session to `user_id` and store its access token.
    pub async fn set_auth(&self, id: &str, user_id: DbId, access_token: &str) -> AuthResult<()> {
        let updated = self
            .store
            .set_session_auth(id, user_id, access_token, self.horizon()?)
            .await?;
        updated.then_some(()).ok_or(AuthError::SessionNotFound)
    }

    /// Drop the access token. The user binding stays.
    pub async fn clear_auth(&self, id: &str) -> AuthResult<()> {
        let updated = self
            .store
            .set_session_access_token(id, None, self.horizon()?)
            .await?;
        updated.then_some(()).ok_or(AuthError::SessionNotFound)
    }

    /// Replace the access token.
    pub async fn set_access_token(&self, id: &str, access_token: &str) -> AuthResult<()> {
        let updated = self
            .store
            .set_session_access_token(id, Some(access_token), self.horizon()?)
            .await?;
        updated.then_some(()).ok_or(AuthError::SessionNotFound)
    }

    /// The user the live session is bound to, if any.
    pub async fn resolve_user(&self, id: &str) -> AuthResult<Option<DbId>> {
        let session = self.store.find_active_session(id).await?;
        Ok(session.and_then(|s| s.user_id))
    }

    pub async fn access_token(&self, id: &str) -> AuthResult<Option<String>> {
        let session = self.store.find_active_session(id).await?;
        Ok(session.and_then(|s| s.access_token))
    }

    /// `Set-Cookie` value carrying session `id`.
    pub fn cookie_header(&self, id: &str) -> AuthResult<HeaderValue> {
        let mut cookie = format!(
            "{}={id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.config.cookie_name, self.config.idle_timeout_secs
        );
        if self.config.secure_cookie {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
            .map_err(|e| AuthError::internal(format!("Invalid session cookie: {e}")))
    }

    /// The session id from the request's `Cookie` headers, if present.
    pub fn cookie_value(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.config.cookie_name)
            .map(|(_, value)| value.trim_matches('"').to_string())
            .filter(|value| !value.is_empty())
    }

    /// Spawn the expired-session sweeper. Runs until `cancel` is triggered.
    pub fn spawn_sweeper(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let period = Duration::from_secs(self.config.sweep_interval_secs);

        tokio::spawn(async move {
            tracing::info!(interval_secs = period.as_secs(), "Session sweeper started");
            let mut interval = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("Session sweeper stopping");
                        break;
                    }
                    _ = interval.tick() => {
                        match store.cleanup_expired_sessions().await {
                            Ok(0) => tracing::debug!("Session sweep: nothing to remove"),
                            Ok(removed) => tracing::info!(removed, "Session sweep: removed expired sessions"),
                            Err(e) => tracing::error!(error = %e, "Session sweep failed"),
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use gatehouse_db::store::MemoryStore;

    use super::*;

    fn tracker() -> SessionTracker {
        SessionTracker::new(Arc::new(MemoryStore::new()), SessionConfig::default())
    }

    #[test]
    fn session_ids_are_256_bit_hex() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_eq!(a.len(), 64);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn created_session_is_anonymous_and_resumable() {
        let tracker = tracker();
        let session = tracker.create().await.unwrap();
        assert!(session.user_id.is_none());
        assert!(session.access_token.is_none());

        let resumed = tracker.resume(&session.id).await.unwrap().unwrap();
        assert!(resumed.expires_at >= session.expires_at);
        assert!(tracker.resume("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn auth_binding_and_clearing() {
        let tracker = tracker();
        let id = tracker.create().await.unwrap().id;

        tracker.set_auth(&id, 5, "access-1").await.unwrap();
        assert_eq!(tracker.resolve_user(&id).await.unwrap(), Some(5));
        assert_eq!(
            tracker.access_token(&id).await.unwrap().as_deref(),
            Some("access-1")
        );

        tracker.set_access_token(&id, "access-2").await.unwrap();
        assert_eq!(
            tracker.access_token(&id).await.unwrap().as_deref(),
            Some("access-2")
        );

        tracker.clear_auth(&id).await.unwrap();
        assert!(tracker.access_token(&id).await.unwrap().is_none());
        assert_eq!(tracker.resolve_user(&id).await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn mutating_a_missing_session_fails() {
        let tracker = tracker();
        assert_matches!(
            tracker.set_auth("missing", 1, "t").await,
            Err(AuthError::SessionNotFound)
        );
        assert_matches!(
            tracker.clear_auth("missing").await,
            Err(AuthError::SessionNotFound)
        );
        assert_eq!(tracker.resolve_user("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn out_of_range_idle_timeout_is_an_error() {
        let tracker = SessionTracker::new(
            Arc::new(MemoryStore::new()),
            SessionConfig {
                idle_timeout_secs: i64::MAX,
                ..SessionConfig::default()
            },
        );
        assert_matches!(tracker.create().await, Err(AuthError::Internal(_)));
        assert_matches!(tracker.resume("any").await, Err(AuthError::Internal(_)));
    }

    #[test]
    fn cookie_header_attributes() {
        let tracker = tracker();
        let value = tracker.cookie_header("abc123").unwrap();
        assert_eq!(
            value.to_str().unwrap(),
            "gatehouse.sid=abc123; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600"
        );

        let secure = SessionTracker::new(
            Arc::new(MemoryStore::new()),
            SessionConfig {
                secure_cookie: true,
                ..SessionConfig::default()
            },
        );
        assert!(secure
            .cookie_header("abc123")
            .unwrap()
            .to_str()
            .unwrap()
            .ends_with("; Secure"));
    }

    #[test]
    fn cookie_value_is_found_among_others() {
        let tracker = tracker();
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            COOKIE,
            HeaderValue::from_static("lang=en; gatehouse.sid=deadbeef; x=1"),
        );
        assert_eq!(tracker.cookie_value(&headers).as_deref(), Some("deadbeef"));

        let mut empty = HeaderMap::new();
        empty.insert(COOKIE, HeaderValue::from_static("gatehouse.sid="));
        assert!(tracker.cookie_value(&empty).is_none());
        assert!(tracker.cookie_value(&HeaderMap::new()).is_none());
    }

    #[test]
    fn cookie_name_must_be_a_token() {
        assert!(is_cookie_token("gatehouse.sid"));
        assert!(!is_cookie_token("bad name"));
        assert!(!is_cookie_token("semi;colon"));
        assert!(!is_cookie_token(""));
    }

    #[tokio::test]
    async fn sweeper_stops_on_cancel() {
        let tracker = tracker();
        let cancel = CancellationToken::new();
        let handle = tracker.spawn_sweeper(cancel.clone());
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should stop")
            .unwrap();
    }
}
