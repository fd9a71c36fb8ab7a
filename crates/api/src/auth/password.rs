//! Argon2id password hashing and verification.
//!
//! All password hashes use the Argon2id variant with a cryptographically random
//! salt generated via [`OsRng`]. The PHC string format is used for storage so
//! that algorithm parameters and salt are embedded in the hash itself, which
//! lets the cost be raised later without invalidating existing hashes.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::config::{ConfigError, EnvSource};

/// Work factor for new hashes.
#[derive(Debug, Clone, Default)]
pub struct HashingConfig {
    pub params: Params,
}

impl HashingConfig {
    /// Read the Argon2 cost from configuration.
    ///
    /// | Env Var                     | Default |
    /// |-----------------------------|---------|
    /// | `PASSWORD_HASH_MEMORY_KIB`  | `19456` |
    /// | `PASSWORD_HASH_ITERATIONS`  | `2`     |
    /// | `PASSWORD_HASH_PARALLELISM` | `1`     |
    pub fn from_source(env: &EnvSource<'_>) -> Result<Self, ConfigError> {
        let memory_kib = env.parsed_or("PASSWORD_HASH_MEMORY_KIB", Params::DEFAULT_M_COST)?;
        let iterations = env.parsed_or("PASSWORD_HASH_ITERATIONS", Params::DEFAULT_T_COST)?;
        let parallelism = env.parsed_or("PASSWORD_HASH_PARALLELISM", Params::DEFAULT_P_COST)?;

        let params = Params::new(memory_kib, iterations, parallelism, None).map_err(|e| {
            ConfigError::Invalid {
                key: "PASSWORD_HASH_MEMORY_KIB",
                value: format!("m={memory_kib} t={iterations} p={parallelism} ({e})"),
            }
        })?;

        Ok(Self { params })
    }
}

/// Hash a plaintext password using Argon2id with a random salt.
///
/// Returns the PHC-formatted hash string (includes algorithm, params, salt, and hash).
pub fn hash_password(
    password: &str,
    config: &HashingConfig,
) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, config.params.clone());
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC-formatted Argon2id hash.
///
/// The cost parameters are read from the hash itself. Returns `Ok(true)` if
/// the password matches, `Ok(false)` if it does not, and `Err` when the stored
/// hash cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
pub(crate) fn cheap_config() -> HashingConfig {
    HashingConfig {
        params: Params::new(64, 1, 1, None).expect("valid test params"),
    }
}
