//! Access-token extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use gatehouse_core::types::DbId;

use crate::error::AppError;
use crate::middleware::session::CurrentSession;
use crate::state::AppState;

/// User whose access token, held by the current session, verified.
///
/// Use this as an extractor parameter in any handler that requires
/// authentication:
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<&'static str> {
///     tracing::info!(user_id = user.user_id, "handling request");
///     Ok("ok")
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Subject of the verified access token.
    pub user_id: DbId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = CurrentSession::from_request_parts(parts, state).await?;
        let claims = state.auth.authorize(&session.id).await?;

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}
