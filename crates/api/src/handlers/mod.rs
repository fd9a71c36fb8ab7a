//! Request handlers.
//!
//! Handlers delegate to [`AuthService`](crate::auth::service::AuthService)
//! and map errors via [`AppError`](crate::error::AppError).

pub mod auth;
