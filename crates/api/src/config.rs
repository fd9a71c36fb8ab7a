use std::str::FromStr;

use crate::auth::jwt::JwtConfig;
use crate::auth::password::HashingConfig;
use crate::auth::session::SessionConfig;

/// Errors raised while reading configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ")]
    SharedSigningSecret,
}

/// Key/value source for configuration. Empty values count as unset.
pub struct EnvSource<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl<'a> EnvSource<'a> {
    pub fn new(lookup: &'a dyn Fn(&str) -> Option<String>) -> Self {
        Self { lookup }
    }

    pub fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    /// Parse `key` if set.
    pub fn parsed<T: FromStr>(&self, key: &'static str) -> Result<Option<T>, ConfigError> {
        self.optional(key)
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| ConfigError::Invalid { key, value })
            })
            .transpose()
    }

    /// Parse `key`, falling back to `default` when unset.
    pub fn parsed_or<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        Ok(self.parsed(key)?.unwrap_or(default))
    }
}

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// Built once at startup and handed to the constructors of the stores,
/// token issuer, and session tracker. Nothing reads the environment later.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Pool size (default: `20`).
    pub database_max_connections: u32,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub log_format: LogFormat,
    /// Signing keys, lifetimes, and refresh behaviour.
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub hashing: HashingConfig,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                    | Required | Default     |
    /// |----------------------------|----------|-------------|
    /// | `HOST`                     | no       | `0.0.0.0`   |
    /// | `PORT`                     | no       | `3000`      |
    /// | `DATABASE_URL`             | **yes**  | --          |
    /// | `DATABASE_MAX_CONNECTIONS` | no       | `20`        |
    /// | `REQUEST_TIMEOUT_SECS`     | no       | `30`        |
    /// | `LOG_FORMAT`               | no       | `text`      |
    ///
    /// Token, session, and hashing variables are listed on [`JwtConfig`],
    /// [`SessionConfig`], and [`HashingConfig`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value lookup.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = EnvSource::new(lookup);

        Ok(Self {
            host: env.optional("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: env.parsed_or("PORT", 3000)?,
            database_url: env.required("DATABASE_URL")?,
            database_max_connections: env.parsed_or("DATABASE_MAX_CONNECTIONS", 20)?,
            request_timeout_secs: env.parsed_or("REQUEST_TIMEOUT_SECS", 30)?,
            log_format: env.parsed_or("LOG_FORMAT", LogFormat::Text)?,
            jwt: JwtConfig::from_source(&env)?,
            session: SessionConfig::from_source(&env)?,
            hashing: HashingConfig::from_source(&env)?,
        })
    }
}
