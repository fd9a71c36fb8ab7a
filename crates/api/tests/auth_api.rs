//! HTTP-level integration tests for the session-backed auth endpoints.
//!
//! Tests cover registration, login, the private route, token refresh, and
//! logout, driven through the full router over an in-memory store.

mod common;

use std::time::Duration;

use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::StatusCode;
use common::{body_json, body_text, delete, get, login, post_json, post_raw, register, session_cookie};
use gatehouse_db::store::SessionStore;
use serde_json::json;

// ---------------------------------------------------------------------------
// Health and request plumbing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_ok_without_a_session() {
    let app = common::build_test_app();
    let response = get(&app, "/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SET_COOKIE).is_none());
    assert!(response.headers().get("x-request-id").is_some());

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["db_healthy"], true);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn every_auth_response_sets_the_session_cookie() {
    let app = common::build_test_app();
    let response = get(&app, "/private", None).await;

    let header = response
        .headers()
        .get(SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(header.starts_with("gatehouse.sid="));
    assert!(header.contains("HttpOnly"));
    assert!(header.contains("SameSite=Lax"));
    assert!(header.contains("Max-Age=3600"));
    assert!(response.headers().get("x-request-id").is_some());
}

#[tokio::test]
async fn unknown_session_cookie_gets_a_fresh_session() {
    let app = common::build_test_app();
    let response = get(&app, "/private", Some("gatehouse.sid=forged")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let cookie = session_cookie(&response);
    assert_ne!(cookie, "gatehouse.sid=forged");
    assert_eq!(cookie.len(), "gatehouse.sid=".len() + 64);
}

#[tokio::test]
async fn live_session_cookie_is_kept() {
    let app = common::build_test_app();
    let first = get(&app, "/private", None).await;
    let cookie = session_cookie(&first);

    let second = get(&app, "/private", Some(&cookie)).await;
    assert_eq!(session_cookie(&second), cookie);
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_redirects_to_login() {
    let app = common::build_test_app();
    let body = json!({ "username": "validuser", "password": "secret1", "email": "a@b.com" });
    let response = post_json(&app, "/register", body, None).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");
}

#[tokio::test]
async fn register_reports_every_violation_as_422() {
    let app = common::build_test_app();
    let body = json!({ "username": "abc", "password": "short", "email": "not-an-email" });
    let response = post_json(&app, "/register", body, None).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let fields: Vec<&str> = json["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "password", "username"]);
}

#[tokio::test]
async fn register_with_short_password_persists_nothing() {
    let app = common::build_test_app();
    let body = json!({ "username": "validuser", "password": "short", "email": "a@b.com" });
    let response = post_json(&app, "/register", body, None).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // The same username is still free.
    register(&app, "validuser").await;
}

#[tokio::test]
async fn register_missing_fields_are_required() {
    let app = common::build_test_app();
    let response = post_json(&app, "/register", json!({}), None).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["details"].as_array().unwrap().len(), 3);
    assert_eq!(json["details"][0]["code"], "required");
}

#[tokio::test]
async fn duplicate_username_and_email_are_400() {
    let app = common::build_test_app();
    register(&app, "validuser").await;

    let same_name = json!({ "username": "validuser", "password": "secret1", "email": "c@d.com" });
    let response = post_json(&app, "/register", same_name, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "DUPLICATE_USERNAME");

    let same_email = json!({
        "username": "otheruser",
        "password": "secret1",
        "email": "ValidUser@Test.com",
    });
    let response = post_json(&app, "/register", same_email, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "DUPLICATE_EMAIL");
}

#[tokio::test]
async fn single_label_email_domain_is_422() {
    let app = common::build_test_app();
    for email in ["a@b", "user@localhost"] {
        let body = json!({ "username": "validuser", "password": "secret1", "email": email });
        let response = post_json(&app, "/register", body, None).await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{email}");
        let json = body_json(response).await;
        assert_eq!(json["details"][0]["field"], "email");
        assert_eq!(json["details"][0]["code"], "email_domain");
    }
}

#[tokio::test]
async fn malformed_json_is_400() {
    let app = common::build_test_app();
    let response = post_raw(&app, "/register", "{not json", None).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// Login and the private route
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_redirects_and_unlocks_private_route() {
    let app = common::build_test_app();
    register(&app, "validuser").await;

    let body = json!({ "username": "validuser", "password": "secret1" });
    let response = post_json(&app, "/login", body, None).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/private");
    let cookie = session_cookie(&response);

    let response = get(&app, "/private", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "This route is private!");
}

#[tokio::test]
async fn private_route_without_login_is_401() {
    let app = common::build_test_app();
    let response = get(&app, "/private", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "ACCESS_DENIED");
    assert_eq!(json["error"], "Access denied");
}

#[tokio::test]
async fn wrong_password_and_unknown_user_get_identical_responses() {
    let app = common::build_test_app();
    register(&app, "validuser").await;

    let wrong = post_json(
        &app,
        "/login",
        json!({ "username": "validuser", "password": "wrong-pass" }),
        None,
    )
    .await;
    let unknown = post_json(
        &app,
        "/login",
        json!({ "username": "ghostuser", "password": "secret1" }),
        None,
    )
    .await;

    assert_eq!(wrong.status(), StatusCode::BAD_REQUEST);
    assert_eq!(wrong.status(), unknown.status());
    let wrong = body_json(wrong).await;
    let unknown = body_json(unknown).await;
    assert_eq!(wrong, unknown);
    assert_eq!(wrong["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn login_validation_is_422() {
    let app = common::build_test_app();
    let response = post_json(&app, "/login", json!({ "username": "validuser" }), None).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["details"][0]["field"], "password");
}

#[tokio::test]
async fn expired_access_token_is_400() {
    let mut config = common::test_config();
    config.jwt.access_token_ttl_secs = 1;
    let app = common::build_test_app_with(config);
    register(&app, "validuser").await;
    let cookie = login(&app, "validuser").await;

    assert_eq!(get(&app, "/private", Some(&cookie)).await.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(2100)).await;

    let response = get(&app, "/private", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "TOKEN_EXPIRED");
}

#[tokio::test]
async fn tampered_access_token_is_400() {
    let (app, store) = common::build_test_app_with_store(common::test_config());
    register(&app, "validuser").await;
    let cookie = login(&app, "validuser").await;
    let (_, session_id) = cookie.split_once('=').unwrap();

    let expires_at = chrono::Utc::now() + chrono::Duration::hours(1);
    let replaced = store
        .set_session_access_token(session_id, Some("not.a.token"), expires_at)
        .await
        .unwrap();
    assert!(replaced);

    let response = get(&app, "/private", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INVALID_TOKEN");
}

// ---------------------------------------------------------------------------
// Token refresh
// ---------------------------------------------------------------------------

#[tokio::test]
async fn token_refresh_returns_201_with_new_access_token() {
    let app = common::build_test_app();
    register(&app, "validuser").await;
    let cookie = login(&app, "validuser").await;

    let response = post_raw(&app, "/token", "", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert!(json["data"]["access_token"].is_string());
    assert_eq!(json["data"]["expires_in"], 900);

    assert_eq!(get(&app, "/private", Some(&cookie)).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn mismatched_presented_refresh_token_is_403() {
    let app = common::build_test_app();
    register(&app, "validuser").await;
    let cookie = login(&app, "validuser").await;

    let response = post_json(
        &app,
        "/token",
        json!({ "refresh_token": "not-the-stored-token" }),
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "INVALID_REFRESH_TOKEN");
}

#[tokio::test]
async fn token_refresh_on_anonymous_session_is_400() {
    let app = common::build_test_app();
    let response = post_raw(&app, "/token", "", None).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn token_refresh_with_malformed_body_is_400() {
    let app = common::build_test_app();
    register(&app, "validuser").await;
    let cookie = login(&app, "validuser").await;

    let response = post_raw(&app, "/token", "{oops", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// Logout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn logout_then_refresh_has_no_refresh_token() {
    let app = common::build_test_app();
    register(&app, "validuser").await;
    let cookie = login(&app, "validuser").await;

    let response = delete(&app, "/logout", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(&app, "/private", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_raw(&app, "/token", "", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "NO_REFRESH_TOKEN");
}

#[tokio::test]
async fn logout_on_anonymous_session_is_400() {
    let app = common::build_test_app();
    let response = delete(&app, "/logout", None).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn login_again_after_logout_restores_access() {
    let app = common::build_test_app();
    register(&app, "validuser").await;
    let cookie = login(&app, "validuser").await;
    delete(&app, "/logout", Some(&cookie)).await;

    let cookie = login(&app, "validuser").await;
    assert_eq!(get(&app, "/private", Some(&cookie)).await.status(), StatusCode::OK);
    assert_eq!(
        post_raw(&app, "/token", "", Some(&cookie)).await.status(),
        StatusCode::CREATED
    );
}
