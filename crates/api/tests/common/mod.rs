use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use gatehouse_api::auth::jwt::{JwtConfig, RefreshSubject};
use gatehouse_api::auth::password::HashingConfig;
use gatehouse_api::auth::session::SessionConfig;
use gatehouse_api::config::{LogFormat, ServerConfig};
use gatehouse_api::routes;
use gatehouse_api::state::AppState;
use gatehouse_db::store::MemoryStore;

/// Build a test `ServerConfig` with safe defaults and a cheap password hash.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "postgres://unused".to_string(),
        database_max_connections: 1,
        request_timeout_secs: 30,
        log_format: LogFormat::Text,
        jwt: JwtConfig {
            access_secret: "integration-access-secret".to_string(),
            refresh_secret: "integration-refresh-secret".to_string(),
            access_token_ttl_secs: 900,
            refresh_token_ttl_days: None,
            refresh_subject: RefreshSubject::RefreshToken,
        },
        session: SessionConfig::default(),
        hashing: HashingConfig {
            params: argon2::Params::new(64, 1, 1, None).unwrap(),
        },
    }
}

/// Build the full application router over an in-memory store.
///
/// Uses [`routes::build_app`], so tests exercise the same middleware stack
/// (session layer, request ID, timeout, tracing, panic recovery) that
/// production uses.
pub fn build_test_app() -> Router {
    build_test_app_with(test_config())
}

pub fn build_test_app_with(config: ServerConfig) -> Router {
    build_test_app_with_store(config).0
}

/// Like [`build_test_app_with`], also returning the backing store.
pub fn build_test_app_with_store(config: ServerConfig) -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(config, store.clone(), store.clone()).unwrap();
    (routes::build_app(state), store)
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

fn with_cookie(
    builder: axum::http::request::Builder,
    cookie: Option<&str>,
) -> axum::http::request::Builder {
    match cookie {
        Some(cookie) => builder.header(COOKIE, cookie),
        None => builder,
    }
}

pub async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let request = with_cookie(Request::builder().method(Method::GET).uri(uri), cookie)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let request = with_cookie(Request::builder().method(Method::DELETE).uri(uri), cookie)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    cookie: Option<&str>,
) -> Response<Body> {
    post_raw(app, uri, &body.to_string(), cookie).await
}

pub async fn post_raw(
    app: &Router,
    uri: &str,
    body: &str,
    cookie: Option<&str>,
) -> Response<Body> {
    let request = with_cookie(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json"),
        cookie,
    )
    .body(Body::from(body.to_string()))
    .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// The `name=value` pair from the response's `Set-Cookie` header.
pub fn session_cookie<B>(response: &Response<B>) -> String {
    response
        .headers()
        .get(SET_COOKIE)
        .expect("response must set the session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

/// Register `username` with password `secret1` and email `<username>@test.com`.
pub async fn register(app: &Router, username: &str) {
    let body = serde_json::json!({
        "username": username,
        "password": "secret1",
        "email": format!("{username}@test.com"),
    });
    let response = post_json(app, "/register", body, None).await;
    assert_eq!(response.status(), axum::http::StatusCode::FOUND);
}

/// Log `username` in with password `secret1`; returns the session cookie.
pub async fn login(app: &Router, username: &str) -> String {
    let body = serde_json::json!({ "username": username, "password": "secret1" });
    let response = post_json(app, "/login", body, None).await;
    assert_eq!(response.status(), axum::http::StatusCode::FOUND);
    session_cookie(&response)
}
