//! Handlers for registration, login, logout, token refresh, and the private route.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gatehouse_core::validation::{LoginInput, RegisterInput};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::session::CurrentSession;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Optional request body for `POST /token`.
#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    pub refresh_token: Option<String>,
}

/// Payload of a successful `POST /token`.
#[derive(Debug, Serialize)]
pub struct AccessGrant {
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /register
///
/// Create an account and redirect to `/login`. The new user is not logged in.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterInput>, JsonRejection>,
) -> AppResult<Response> {
    let Json(input) = payload.map_err(malformed_body)?;
    state.auth.register(input).await?;
    Ok(found("/login"))
}

/// POST /login
///
/// Verify credentials, bind the session to the user, and redirect to `/private`.
pub async fn login(
    State(state): State<AppState>,
    session: CurrentSession,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> AppResult<Response> {
    let Json(input) = payload.map_err(malformed_body)?;
    state.auth.login(&session.id, input).await?;
    Ok(found("/private"))
}

/// DELETE /logout
///
/// Revoke the refresh token and drop the session's access token. Returns 204.
pub async fn logout(
    State(state): State<AppState>,
    session: CurrentSession,
) -> AppResult<StatusCode> {
    state.auth.logout(&session.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /token
///
/// Mint a new access token from the stored refresh token. A JSON body with a
/// `refresh_token` field is optional; when present it must match the stored
/// token. Returns 201 with `{ data: { access_token, expires_in } }`.
pub async fn refresh_token(
    State(state): State<AppState>,
    session: CurrentSession,
    body: Bytes,
) -> AppResult<(StatusCode, Json<DataResponse<AccessGrant>>)> {
    let request: TokenRequest = if body.iter().all(u8::is_ascii_whitespace) {
        TokenRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Malformed request body: {e}")))?
    };

    let access_token = state
        .auth
        .refresh_access_token(&session.id, request.refresh_token.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: AccessGrant {
                access_token,
                expires_in: state.auth.tokens().access_token_ttl_secs(),
            },
        }),
    ))
}

/// GET /private
///
/// Reachable only with a verified access token on the session.
pub async fn private(user: AuthUser) -> &'static str {
    tracing::debug!(user_id = user.user_id, "Private route accessed");
    "This route is private!"
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// 302 Found redirect to `location`.
fn found(location: &'static str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

fn malformed_body(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}
