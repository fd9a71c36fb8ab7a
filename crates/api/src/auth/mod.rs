//! Credential and session lifecycle.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- access/refresh token issuing and verification.
//! - [`session`] -- server-side sessions bound to a cookie.
//! - [`service`] -- register, login, logout, and refresh flows.
//! - [`error`] -- the [`AuthError`](error::AuthError) taxonomy.

pub mod error;
pub mod jwt;
pub mod password;
pub mod service;
pub mod session;
