//! Integration tests for Ashpazkhoone.
//!
//! Tests drive the full API router in-process: every [`TestApp`] gets its own
//! temporary data file and upload directory, and requests go through the same
//! middleware stack as production via `tower::ServiceExt::oneshot`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ashpazkhoone-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth` - Registration, login, sessions and role checks
//! - `catalog` - Products, categories and reviews
//! - `checkout` - Quotes, orders, tracking and coupons
//! - `back_office` - Settings, uploads, backup/restore and stats

#![allow(clippy::missing_panics_doc)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use ashpazkhoone_api::config::ApiConfig;
use ashpazkhoone_api::middleware::SESSION_COOKIE_NAME;
use ashpazkhoone_api::services::auth::{AuthService, NewAccount};
use ashpazkhoone_api::state::AppState;
use ashpazkhoone_core::UserRole;

/// Credentials of the admin created by [`TestApp::admin_session`].
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin password 123";

/// Largest upload accepted by test apps.
pub const TEST_MAX_UPLOAD_BYTES: usize = 64 * 1024;

/// A minimal PNG header; enough for type detection.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

/// A response with its body read.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// The body parsed as JSON, `Null` when empty.
    pub fn json(&self) -> Value {
        if self.body.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    /// The `ak_session` cookie set by this response, as `name=value`.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .find(|pair| pair.starts_with(&format!("{SESSION_COOKIE_NAME}=")))
            .map(str::to_owned)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// The API over a throwaway data directory.
pub struct TestApp {
    router: Router,
    state: AppState,
    dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Build an app after adjusting the default test configuration.
    pub fn with_config(adjust: impl FnOnce(&mut ApiConfig)) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mut config = ApiConfig {
            data_file: dir.path().join("data").join("db.json"),
            upload_dir: dir.path().join("uploads"),
            max_upload_bytes: TEST_MAX_UPLOAD_BYTES,
            ..ApiConfig::default()
        };
        adjust(&mut config);

        let state = AppState::new(config);
        // One router per app, so every request shares the session store.
        let router = ashpazkhoone_api::app(state.clone());
        Self { router, state, dir }
    }

    pub const fn state(&self) -> &AppState {
        &self.state
    }

    pub fn dir(&self) -> &std::path::Path {
        self.dir.path()
    }

    /// Send a request with an optional JSON body and session cookie.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<&Value>,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("failed to build request");
        self.send(request).await
    }

    /// Send a prepared request.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read body")
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, None, cookie).await
    }

    pub async fn post(&self, uri: &str, body: &Value, cookie: Option<&str>) -> TestResponse {
        self.request(Method::POST, uri, Some(body), cookie).await
    }

    pub async fn put(&self, uri: &str, body: &Value, cookie: Option<&str>) -> TestResponse {
        self.request(Method::PUT, uri, Some(body), cookie).await
    }

    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, None, cookie).await
    }

    /// Log in and return the session cookie.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post(
                "/api/auth/login",
                &json!({ "email": email, "password": password }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {response:?}");
        response.session_cookie().expect("login set no session cookie")
    }

    /// Create the admin account (once) and return a logged-in session.
    pub async fn admin_session(&self) -> String {
        let db = self.state.db().read().await.expect("data file unreadable");
        if !db.users.iter().any(|u| u.email.as_str() == ADMIN_EMAIL) {
            AuthService::new(self.state.db())
                .register(NewAccount {
                    name: "Admin",
                    email: ADMIN_EMAIL,
                    password: ADMIN_PASSWORD,
                    phone: None,
                    role: UserRole::Admin,
                })
                .await
                .expect("failed to create admin");
        }
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Register a customer and return the session cookie.
    pub async fn customer_session(&self, email: &str) -> String {
        let response = self
            .post(
                "/api/auth/register",
                &json!({
                    "name": "Customer",
                    "email": email,
                    "password": "customer password",
                    "phone": "09121234567",
                }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "register failed: {response:?}");
        response
            .session_cookie()
            .expect("register set no session cookie")
    }

    /// Create a product as admin and return its JSON.
    pub async fn create_product(&self, admin: &str, body: Value) -> Value {
        let response = self.post("/api/products", &body, Some(admin)).await;
        assert_eq!(response.status, StatusCode::CREATED, "create failed: {response:?}");
        response.json()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// A checkout body for `items`, with valid customer and address details.
pub fn checkout_body(items: &Value) -> Value {
    json!({
        "items": items,
        "customer": { "name": "Sara Ahmadi", "phone": "09121234567" },
        "shippingAddress": {
            "fullName": "Sara Ahmadi",
            "phone": "09121234567",
            "province": "Tehran",
            "city": "Tehran",
            "address": "No. 12, Azadi St.",
            "postalCode": "1234567890",
        },
        "paymentMethod": "cash_on_delivery",
    })
}
