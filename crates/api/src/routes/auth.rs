//! Route definitions for the session-backed auth endpoints.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Auth routes. All of them sit behind the session layer.
///
/// ```text
/// POST   /register  -> register
/// POST   /login     -> login
/// DELETE /logout    -> logout
/// POST   /token     -> refresh_token
/// GET    /private   -> private (requires access token)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", delete(auth::logout))
        .route("/token", post(auth::refresh_token))
        .route("/private", get(auth::private))
}
