//! Access- and refresh-token issuing and verification.
//!
//! Both tokens are HS256-signed JWTs, each under its own secret, so a token of
//! one kind never verifies as the other. Access tokens always carry `exp`;
//! refresh tokens only do when a refresh lifetime is configured.

use std::fmt;
use std::str::FromStr;

use gatehouse_core::types::DbId;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::error::{AuthError, AuthResult};
use crate::config::{ConfigError, EnvSource};

/// Claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Unique token identifier (UUID v4).
    pub jti: String,
}

/// Claims embedded in every refresh token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RefreshClaims {
    pub sub: DbId,
    pub iat: i64,
    /// Present only when `REFRESH_TOKEN_TTL_DAYS` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    pub jti: String,
}

/// Which user id a refreshed access token is issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshSubject {
    /// The `sub` claim of the verified refresh token.
    #[default]
    RefreshToken,
    /// The user resolved from the session.
    StoredUser,
}

impl FromStr for RefreshSubject {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "refresh_token" => Ok(Self::RefreshToken),
            "user" => Ok(Self::StoredUser),
            _ => Err(()),
        }
    }
}

/// Default access token lifetime in seconds.
const DEFAULT_ACCESS_TTL_SECS: i64 = 900;

/// Upper bound for `ACCESS_TOKEN_TTL_SECS` (one day).
const MAX_ACCESS_TTL_SECS: i64 = 24 * 60 * 60;

/// Upper bound for `REFRESH_TOKEN_TTL_DAYS` (ten years).
const MAX_REFRESH_TTL_DAYS: i64 = 3650;

const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Signing keys and token lifetimes.
#[derive(Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    /// Access token lifetime in seconds (default: 900).
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in days. `None` issues refresh tokens without `exp`.
    pub refresh_token_ttl_days: Option<i64>,
    pub refresh_subject: RefreshSubject,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_days", &self.refresh_token_ttl_days)
            .field("refresh_subject", &self.refresh_subject)
            .finish()
    }
}

impl JwtConfig {
    /// Load token configuration.
    ///
    /// | Env Var                  | Required | Default         |
    /// |--------------------------|----------|-----------------|
    /// | `ACCESS_TOKEN_SECRET`    | **yes**  | --              |
    /// | `REFRESH_TOKEN_SECRET`   | **yes**  | --              |
    /// | `ACCESS_TOKEN_TTL_SECS`  | no       | `900`           |
    /// | `REFRESH_TOKEN_TTL_DAYS` | no       | unset           |
    /// | `REFRESH_ACCESS_SUBJECT` | no       | `refresh_token` |
    ///
    /// The two secrets must differ.
    pub fn from_source(env: &EnvSource<'_>) -> Result<Self, ConfigError> {
        let access_secret = env.required("ACCESS_TOKEN_SECRET")?;
        let refresh_secret = env.required("REFRESH_TOKEN_SECRET")?;
        if access_secret == refresh_secret {
            return Err(ConfigError::SharedSigningSecret);
        }

        let access_token_ttl_secs =
            env.parsed_or("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TTL_SECS)?;
        if !(1..=MAX_ACCESS_TTL_SECS).contains(&access_token_ttl_secs) {
            return Err(ConfigError::Invalid {
                key: "ACCESS_TOKEN_TTL_SECS",
                value: access_token_ttl_secs.to_string(),
            });
        }

        let refresh_token_ttl_days: Option<i64> = env.parsed("REFRESH_TOKEN_TTL_DAYS")?;
        if let Some(days) =
            refresh_token_ttl_days.filter(|d| !(1..=MAX_REFRESH_TTL_DAYS).contains(d))
        {
            return Err(ConfigError::Invalid {
                key: "REFRESH_TOKEN_TTL_DAYS",
                value: days.to_string(),
            });
        }

        Ok(Self {
            access_secret,
            refresh_secret,
            access_token_ttl_secs,
            refresh_token_ttl_days,
            refresh_subject: env.parsed_or("REFRESH_ACCESS_SUBJECT", RefreshSubject::default())?,
        })
    }
}

/// Issues and verifies both token kinds. Keys are derived once at construction.
#[derive(Clone)]
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_validation: Validation,
    refresh_validation: Validation,
    access_token_ttl_secs: i64,
    refresh_token_ttl_secs: Option<i64>,
    refresh_subject: RefreshSubject,
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig) -> Self {
        let mut access_validation = Validation::new(Algorithm::HS256);
        access_validation.leeway = 0;

        let mut refresh_validation = Validation::new(Algorithm::HS256);
        refresh_validation.leeway = 0;
        if config.refresh_token_ttl_days.is_some() {
            refresh_validation.set_required_spec_claims(&["exp"]);
        } else {
            refresh_validation.required_spec_claims.clear();
            refresh_validation.validate_exp = false;
        }

        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_validation,
            refresh_validation,
            access_token_ttl_secs: config.access_token_ttl_secs,
            refresh_token_ttl_secs: config
                .refresh_token_ttl_days
                .map(|d| d.saturating_mul(SECS_PER_DAY)),
            refresh_subject: config.refresh_subject,
        }
    }

    /// Access token lifetime in seconds, as reported to clients in `expires_in`.
    pub fn access_token_ttl_secs(&self) -> i64 {
        self.access_token_ttl_secs
    }

    pub fn refresh_subject(&self) -> RefreshSubject {
        self.refresh_subject
    }

    /// Sign a short-lived access token for `user_id`.
    pub fn issue_access(&self, user_id: DbId) -> AuthResult<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = AccessClaims {
            sub: user_id,
            iat: now,
            exp: expiry(now, self.access_token_ttl_secs)?,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.access_encoding)
            .map_err(|e| AuthError::internal(format!("Access token signing error: {e}")))
    }

    /// Sign a refresh token for `user_id` under the refresh secret.
    pub fn issue_refresh(&self, user_id: DbId) -> AuthResult<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: user_id,
            iat: now,
            exp: self
                .refresh_token_ttl_secs
                .map(|ttl| expiry(now, ttl))
                .transpose()?,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.refresh_encoding)
            .map_err(|e| AuthError::internal(format!("Refresh token signing error: {e}")))
    }

    /// Check signature and expiry of an access token.
    ///
    /// An elapsed `exp` yields [`AuthError::Expired`]; every other failure
    /// yields [`AuthError::InvalidAccessToken`].
    pub fn verify_access(&self, token: &str) -> AuthResult<AccessClaims> {
        decode::<AccessClaims>(token, &self.access_decoding, &self.access_validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidAccessToken,
            })
    }

    /// Check a refresh token's signature, and its expiry when one is configured.
    pub fn verify_refresh(&self, token: &str) -> AuthResult<RefreshClaims> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &self.refresh_validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidRefreshToken)
    }
}

fn expiry(now: i64, ttl_secs: i64) -> AuthResult<i64> {
    now.checked_add(ttl_secs)
        .ok_or_else(|| AuthError::internal(format!("Token lifetime out of range: {ttl_secs}s")))
}

#[cfg(test)]
pub(crate) fn test_config() -> JwtConfig {
    JwtConfig {
        access_secret: "test-access-secret-that-is-long-enough".to_string(),
        refresh_secret: "test-refresh-secret-that-is-long-enough".to_string(),
        access_token_ttl_secs: 900,
        refresh_token_ttl_days: None,
        refresh_subject: RefreshSubject::RefreshToken,
    }
}
