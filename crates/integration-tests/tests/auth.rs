//! Integration tests for accounts, sessions and access control.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use ashpazkhoone_integration_tests::{ADMIN_EMAIL, TestApp};

// =============================================================================
// Health & Middleware
// =============================================================================

#[tokio::test]
async fn test_health_endpoints_are_public() {
    let app = TestApp::new();

    let live = app.get("/health", None).await;
    assert_eq!(live.status, StatusCode::OK);

    let ready = app.get("/health/ready", None).await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_security_headers_on_api_responses() {
    let app = TestApp::new();
    let response = app.get("/api/products", None).await;

    assert_eq!(response.header("x-content-type-options"), Some("nosniff"));
    assert_eq!(response.header("x-frame-options"), Some("DENY"));
    assert_eq!(response.header("cache-control"), Some("no-store, max-age=0"));
    assert!(response.header("x-request-id").is_some());
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-abc-123")
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.header("x-request-id"), Some("trace-abc-123"));
}

// =============================================================================
// Registration & Login
// =============================================================================

#[tokio::test]
async fn test_register_then_me_then_logout() {
    let app = TestApp::new();
    let cookie = app.customer_session("sara@example.com").await;

    let me = app.get("/api/auth/me", Some(&cookie)).await;
    assert_eq!(me.status, StatusCode::OK);
    let body = me.json();
    assert_eq!(body["email"], json!("sara@example.com"));
    assert_eq!(body["role"], json!("customer"));
    assert!(body.get("passwordHash").is_none());

    let logout = app.post("/api/auth/logout", &json!({}), Some(&cookie)).await;
    assert_eq!(logout.status, StatusCode::NO_CONTENT);

    let after = app.get("/api/auth/me", Some(&cookie)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = TestApp::new();
    app.customer_session("sara@example.com").await;

    let again = app
        .post(
            "/api/auth/register",
            &json!({ "name": "Other", "email": "SARA@example.com", "password": "another password" }),
            None,
        )
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let app = TestApp::new();
    let response = app
        .post(
            "/api/auth/register",
            &json!({ "name": "Sara", "email": "sara@example.com", "password": "short" }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].is_string());
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let app = TestApp::new();
    app.admin_session().await;

    let response = app
        .post(
            "/api/auth/login",
            &json!({ "email": ADMIN_EMAIL, "password": "not the password" }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.session_cookie().is_none());
}

// =============================================================================
// Access Control
// =============================================================================

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let app = TestApp::new();
    let customer = app.customer_session("sara@example.com").await;
    let admin = app.admin_session().await;

    assert_eq!(app.get("/api/users", None).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.get("/api/users", Some(&customer)).await.status,
        StatusCode::FORBIDDEN
    );

    let users = app.get("/api/users", Some(&admin)).await;
    assert_eq!(users.status, StatusCode::OK);
    assert_eq!(users.json().as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_admin_cannot_delete_own_account() {
    let app = TestApp::new();
    let admin = app.admin_session().await;
    let me = app.get("/api/auth/me", Some(&admin)).await.json();
    let id = me["id"].as_i64().unwrap();

    let response = app.delete(&format!("/api/users/{id}"), Some(&admin)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deleted_user_session_is_dropped() {
    let app = TestApp::new();
    let admin = app.admin_session().await;
    let customer = app.customer_session("sara@example.com").await;
    let id = app.get("/api/auth/me", Some(&customer)).await.json()["id"]
        .as_i64()
        .unwrap();

    let deleted = app.delete(&format!("/api/users/{id}"), Some(&admin)).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let me = app.get("/api/auth/me", Some(&customer)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_changes_apply_to_live_sessions() {
    let app = TestApp::new();
    let admin = app.admin_session().await;
    let sara = app.customer_session("sara@example.com").await;
    let id = app.get("/api/auth/me", Some(&sara)).await.json()["id"]
        .as_i64()
        .unwrap();
    let uri = format!("/api/users/{id}");

    assert_eq!(app.get("/api/backup", Some(&sara)).await.status, StatusCode::FORBIDDEN);

    let promoted = app.put(&uri, &json!({ "role": "admin" }), Some(&admin)).await;
    assert_eq!(promoted.status, StatusCode::OK);
    assert_eq!(app.get("/api/backup", Some(&sara)).await.status, StatusCode::OK);

    let demoted = app.put(&uri, &json!({ "role": "customer" }), Some(&admin)).await;
    assert_eq!(demoted.status, StatusCode::OK);
    assert_eq!(app.get("/api/backup", Some(&sara)).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get("/api/users", Some(&sara)).await.status, StatusCode::FORBIDDEN);

    // Still logged in, just without admin rights.
    let me = app.get("/api/auth/me", Some(&sara)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json()["role"], json!("customer"));
}

#[tokio::test]
async fn test_deleted_admin_loses_access() {
    let app = TestApp::new();
    let admin = app.admin_session().await;
    let sara = app.customer_session("sara@example.com").await;
    let id = app.get("/api/auth/me", Some(&sara)).await.json()["id"]
        .as_i64()
        .unwrap();
    app.put(&format!("/api/users/{id}"), &json!({ "role": "admin" }), Some(&admin))
        .await;
    assert_eq!(app.get("/api/users", Some(&sara)).await.status, StatusCode::OK);

    let deleted = app.delete(&format!("/api/users/{id}"), Some(&admin)).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    assert_eq!(app.get("/api/users", Some(&sara)).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.get("/api/backup", Some(&sara)).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_restore_drops_sessions_of_missing_users() {
    let app = TestApp::new();
    let admin = app.admin_session().await;
    let backup = app.get("/api/backup", Some(&admin)).await.json();

    let sara = app.customer_session("sara@example.com").await;
    assert_eq!(app.get("/api/auth/me", Some(&sara)).await.status, StatusCode::OK);

    let restored = app.post("/api/restore", &backup, Some(&admin)).await;
    assert_eq!(restored.status, StatusCode::OK);

    assert_eq!(app.get("/api/auth/me", Some(&sara)).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.get("/api/auth/me", Some(&admin)).await.status, StatusCode::OK);
}
