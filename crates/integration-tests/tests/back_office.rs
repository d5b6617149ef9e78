//! Integration tests for settings, uploads, blog, backup/restore and stats.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};

use ashpazkhoone_integration_tests::{
    PNG_BYTES, TEST_MAX_UPLOAD_BYTES, TestApp, TestResponse, checkout_body,
};

const BOUNDARY: &str = "ak-test-boundary";

async fn upload_multipart(app: &TestApp, cookie: &str, field: &str, bytes: &[u8]) -> TestResponse {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"photo.png\"\r\nContent-Type: image/png\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap();
    app.send(request).await
}

// =============================================================================
// Settings
// =============================================================================

#[tokio::test]
async fn test_settings_default_and_update() {
    let app = TestApp::new();
    let admin = app.admin_session().await;

    let defaults = app.get("/api/settings", None).await;
    assert_eq!(defaults.status, StatusCode::OK);
    assert_eq!(defaults.json()["shipping"]["flatRate"], json!(40_000));

    let mut settings = defaults.json();
    settings["shipping"]["flatRate"] = json!(55_000);
    settings["payment"]["cardToCard"] = json!(true);
    let updated = app.put("/api/settings", &settings, Some(&admin)).await;
    assert_eq!(updated.status, StatusCode::OK);

    let stored = app.get("/api/settings", None).await.json();
    assert_eq!(stored["shipping"]["flatRate"], json!(55_000));
    assert_eq!(stored["payment"]["cardToCard"], json!(true));
}

#[tokio::test]
async fn test_settings_accepts_legacy_flat_shape() {
    let app = TestApp::new();
    let admin = app.admin_session().await;

    let legacy = json!({ "siteName": "Ashpazkhoone", "shippingCost": 30_000, "phone": "021-1234" });
    let response = app.put("/api/settings", &legacy, Some(&admin)).await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["general"]["siteName"], json!("Ashpazkhoone"));
    assert_eq!(body["shipping"]["flatRate"], json!(30_000));
    assert_eq!(body["contact"]["phone"], json!("021-1234"));
}

#[tokio::test]
async fn test_settings_rejects_newer_schema() {
    let app = TestApp::new();
    let admin = app.admin_session().await;

    let response = app
        .put("/api/settings", &json!({ "schemaVersion": 99 }), Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_settings_shipping_applies_to_quotes() {
    let app = TestApp::new();
    let admin = app.admin_session().await;
    let pan = app
        .create_product(&admin, json!({ "name": "Pan", "price": 100_000, "stock": 3 }))
        .await;

    let mut settings = app.get("/api/settings", None).await.json();
    settings["shipping"]["flatRate"] = json!(10_000);
    app.put("/api/settings", &settings, Some(&admin)).await;

    let quote = app
        .post(
            "/api/cart/quote",
            &json!({ "items": [{ "productId": pan["id"], "quantity": 1 }] }),
            None,
        )
        .await
        .json();
    assert_eq!(quote["total"], json!(110_000));
}

// =============================================================================
// Uploads
// =============================================================================

#[tokio::test]
async fn test_multipart_upload_is_served_and_deletable() {
    let app = TestApp::new();
    let admin = app.admin_session().await;

    let response = upload_multipart(&app, &admin, "image", PNG_BYTES).await;
    assert_eq!(response.status, StatusCode::CREATED, "{response:?}");
    let stored = response.json();
    let url = stored["url"].as_str().unwrap();
    assert!(url.starts_with("/uploads/"));
    assert!(url.ends_with(".png"));
    assert_eq!(stored["contentType"], json!("image/png"));

    let served = app.get(url, None).await;
    assert_eq!(served.status, StatusCode::OK);
    assert_eq!(served.body, PNG_BYTES);
    assert_eq!(
        served.header("cross-origin-resource-policy"),
        Some("cross-origin")
    );

    let name = stored["name"].as_str().unwrap();
    let deleted = app.delete(&format!("/api/upload/{name}"), Some(&admin)).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(url, None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_rejects_non_images() {
    let app = TestApp::new();
    let admin = app.admin_session().await;

    let response = upload_multipart(&app, &admin, "file", b"#!/bin/sh\necho hi\n").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_rejects_oversized_file() {
    let app = TestApp::new();
    let admin = app.admin_session().await;
    let mut bytes = PNG_BYTES.to_vec();
    bytes.resize(TEST_MAX_UPLOAD_BYTES + 1, 0);

    let response = upload_multipart(&app, &admin, "image", &bytes).await;
    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_upload_requires_admin() {
    let app = TestApp::new();
    let customer = app.customer_session("sara@example.com").await;

    let response = upload_multipart(&app, &customer, "image", PNG_BYTES).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_base64_upload() {
    use base64::Engine as _;

    let app = TestApp::new();
    let admin = app.admin_session().await;
    let data_url = format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(PNG_BYTES)
    );

    let response = app
        .post("/api/upload/base64", &json!({ "dataUrl": data_url }), Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.json()["size"], json!(PNG_BYTES.len()));

    let bad = app
        .post("/api/upload/base64", &json!({ "dataUrl": "not a data url" }), Some(&admin))
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Blog
// =============================================================================

#[tokio::test]
async fn test_drafts_hidden_until_published() {
    let app = TestApp::new();
    let admin = app.admin_session().await;

    let created = app
        .post(
            "/api/blog",
            &json!({ "title": "Saffron Rice", "content": "...", "tags": ["recipes"] }),
            Some(&admin),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let post = created.json();
    assert_eq!(post["slug"], json!("saffron-rice"));

    assert!(app.get("/api/blog", None).await.json().as_array().unwrap().is_empty());
    assert_eq!(
        app.get("/api/blog/saffron-rice", None).await.status,
        StatusCode::NOT_FOUND
    );
    let drafts = app.get("/api/blog?all=true", Some(&admin)).await.json();
    assert_eq!(drafts.as_array().unwrap().len(), 1);

    let published = app
        .put(
            &format!("/api/blog/{}", post["id"]),
            &json!({ "published": true }),
            Some(&admin),
        )
        .await;
    assert_eq!(published.status, StatusCode::OK);
    assert!(published.json()["publishedAt"].is_string());

    let listed = app.get("/api/blog?tag=recipes", None).await.json();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(
        app.get("/api/blog/saffron-rice", None).await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_blog_update_with_non_numeric_id_is_rejected() {
    let app = TestApp::new();
    let admin = app.admin_session().await;

    let response = app
        .put("/api/blog/saffron-rice", &json!({ "published": true }), Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Backup & Restore
// =============================================================================

#[tokio::test]
async fn test_backup_then_restore_round_trip() {
    let app = TestApp::new();
    let admin = app.admin_session().await;
    app.create_product(&admin, json!({ "name": "Pan", "price": 100_000, "stock": 3 }))
        .await;

    let backup = app.get("/api/backup", Some(&admin)).await;
    assert_eq!(backup.status, StatusCode::OK);
    let disposition = backup.header("content-disposition").unwrap();
    assert!(disposition.starts_with("attachment; filename=\"ashpazkhoone-backup-"));
    let envelope = backup.json();
    assert_eq!(envelope["version"], json!(1));
    assert_eq!(envelope["data"]["products"].as_array().unwrap().len(), 1);

    app.create_product(&admin, json!({ "name": "Pot", "price": 200_000 }))
        .await;
    assert_eq!(app.get("/api/products", None).await.json()["total"], json!(2));

    let restored = app.post("/api/restore", &envelope, Some(&admin)).await;
    assert_eq!(restored.status, StatusCode::OK);
    assert_eq!(restored.json()["products"], json!(1));
    assert_eq!(app.get("/api/products", None).await.json()["total"], json!(1));

    // The admin session survives, since the account was in the backup.
    assert_eq!(app.get("/api/auth/me", Some(&admin)).await.status, StatusCode::OK);
    assert!(app.dir().join("data").join("db.json.pre-restore").exists());
}

#[tokio::test]
async fn test_restore_rejects_backup_without_admin() {
    let app = TestApp::new();
    let admin = app.admin_session().await;

    let response = app
        .post(
            "/api/restore",
            &json!({ "version": 1, "exportedAt": "2024-01-01T00:00:00Z", "data": { "users": [] } }),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.get("/api/auth/me", Some(&admin)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_restore_rejects_newer_envelope() {
    let app = TestApp::new();
    let admin = app.admin_session().await;

    let response = app
        .post("/api/restore", &json!({ "version": 9, "data": {} }), Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_backup_requires_admin() {
    let app = TestApp::new();
    let customer = app.customer_session("sara@example.com").await;

    assert_eq!(
        app.get("/api/backup", Some(&customer)).await.status,
        StatusCode::FORBIDDEN
    );
}

// =============================================================================
// Dashboard
// =============================================================================

#[tokio::test]
async fn test_stats_summarize_store() {
    let app = TestApp::new();
    let admin = app.admin_session().await;
    let pan = app
        .create_product(&admin, json!({ "name": "Pan", "price": 100_000, "stock": 3 }))
        .await;
    app.customer_session("sara@example.com").await;
    app.post(
        "/api/orders",
        &checkout_body(&json!([{ "productId": pan["id"], "quantity": 1 }])),
        None,
    )
    .await;

    let stats: Value = app.get("/api/admin/stats", Some(&admin)).await.json();
    assert_eq!(stats["products"], json!(1));
    assert_eq!(stats["orders"], json!(1));
    assert_eq!(stats["pendingOrders"], json!(1));
    assert_eq!(stats["customers"], json!(1));
    assert_eq!(stats["revenue"], json!(0));
    assert_eq!(stats["lowStock"][0]["name"], json!("Pan"));
    assert_eq!(stats["recentOrders"].as_array().unwrap().len(), 1);
}
