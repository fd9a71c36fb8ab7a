//! Cookie-backed session middleware.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::SET_COOKIE;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Id of the live session attached to the current request.
///
/// Inserted into the request extensions by [`session_layer`]; use it as an
/// extractor in handlers mounted behind that layer.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub id: String,
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or_else(|| AppError::InternalError("Session layer is not installed".into()))
    }
}

/// Resume the session named by the request cookie, or start a new one, and
/// set the session cookie on the response.
///
/// Every request through this layer extends the session's idle horizon.
pub async fn session_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let tracker = state.auth.sessions();

    let resumed = match tracker.cookie_value(request.headers()) {
        Some(id) => tracker.resume(&id).await?,
        None => None,
    };
    let session = match resumed {
        Some(session) => session,
        None => {
            let session = tracker.create().await?;
            tracing::debug!("Started new session");
            session
        }
    };

    let cookie = tracker.cookie_header(&session.id)?;
    request
        .extensions_mut()
        .insert(CurrentSession { id: session.id });

    let mut response = next.run(request).await;
    response.headers_mut().append(SET_COOKIE, cookie);
    Ok(response)
}
