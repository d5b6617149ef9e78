//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness
//! GET  /health/ready                   - Data file readable
//!
//! # Auth & account
//! POST /api/auth/register              - Create customer account, log in
//! POST /api/auth/login                 - Log in
//! POST /api/auth/logout                - Log out
//! GET  /api/auth/me                    - Current user
//! GET  /api/account/orders             - Own orders
//!
//! # Catalog
//! GET  /api/products                   - Filtered, paginated listing
//! GET  /api/products/{id}              - Product
//! GET  /api/products/slug/{slug}       - Product by slug
//! GET  /api/products/{id}/reviews      - Approved reviews and rating
//! POST /api/products                   - Create (admin)
//! PUT  /api/products/{id}              - Update (admin)
//! DEL  /api/products/{id}              - Delete (admin)
//! GET  /api/categories[/{id}]          - Categories
//! POST/PUT/DEL /api/categories[/{id}]  - Manage (admin)
//!
//! # Cart & orders
//! POST /api/cart/quote                 - Price a cart
//! POST /api/orders                     - Checkout
//! GET  /api/orders/track               - Track by number and phone
//! GET  /api/orders                     - List (admin)
//! GET  /api/orders/{id}                - Order (admin or owner)
//! PUT  /api/orders/{id}/status         - Change status (admin)
//! PUT  /api/orders/{id}/payment        - Payment status (admin)
//! DEL  /api/orders/{id}                - Delete (admin)
//!
//! # Content
//! GET  /api/blog[/{slug}]              - Published posts
//! POST/PUT/DEL /api/blog[/{id}]        - Manage (admin)
//! POST /api/reviews                    - Submit review
//! GET/PUT/DEL /api/reviews[/{id}]      - Moderate (admin)
//!
//! # Back-office
//! /api/users, /api/coupons, /api/settings, /api/upload,
//! /api/backup, /api/restore, /api/admin/stats
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod blog;
pub mod categories;
pub mod coupons;
pub mod health;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod settings;
pub mod uploads;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};

use crate::config::ApiConfig;
use crate::state::AppState;

/// Body limit for restore uploads.
const MAX_RESTORE_BYTES: usize = 64 * 1024 * 1024;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/slug/{slug}", get(products::show_by_slug))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::destroy),
        )
        .route("/{id}/reviews", get(products::reviews))
}

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index).post(categories::create))
        .route(
            "/{id}",
            get(categories::show)
                .put(categories::update)
                .delete(categories::destroy),
        )
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/track", get(orders::track))
        .route("/{id}", get(orders::show).delete(orders::destroy))
        .route("/{id}/status", put(orders::update_status))
        .route("/{id}/payment", put(orders::update_payment))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/", get(users::index)).route(
        "/{id}",
        get(users::show).put(users::update).delete(users::destroy),
    )
}

pub fn blog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(blog::index).post(blog::create))
        // GET takes a slug, PUT and DELETE an id.
        .route(
            "/{key}",
            get(blog::show).put(blog::update).delete(blog::destroy),
        )
}

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(reviews::index).post(reviews::create))
        .route("/{id}", put(reviews::moderate).delete(reviews::destroy))
}

pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(coupons::index).post(coupons::create))
        .route("/validate", post(coupons::validate))
        .route("/{id}", put(coupons::update).delete(coupons::destroy))
}

/// Upload routes, with a body limit that fits a base64-encoded maximum-size image.
pub fn upload_routes(max_upload_bytes: usize) -> Router<AppState> {
    let limit = max_upload_bytes
        .saturating_mul(4)
        .div_ceil(3)
        .saturating_add(MULTIPART_OVERHEAD);
    Router::new()
        .route("/", post(uploads::upload))
        .route("/base64", post(uploads::upload_base64))
        .route("/{name}", delete(uploads::destroy))
        .layer(DefaultBodyLimit::max(limit))
}

/// Create all API routes.
pub fn routes(config: &ApiConfig) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/auth", auth_routes())
        .route("/api/account/orders", get(account::orders))
        .nest("/api/products", product_routes())
        .nest("/api/categories", category_routes())
        .route("/api/cart/quote", post(orders::quote))
        .nest("/api/orders", order_routes())
        .nest("/api/users", user_routes())
        .nest("/api/blog", blog_routes())
        .nest("/api/reviews", review_routes())
        .nest("/api/coupons", coupon_routes())
        .route(
            "/api/settings",
            get(settings::show).put(settings::update),
        )
        .nest("/api/upload", upload_routes(config.max_upload_bytes))
        .route("/api/backup", get(admin::backup))
        .route(
            "/api/restore",
            post(admin::restore).layer(DefaultBodyLimit::max(MAX_RESTORE_BYTES)),
        )
        .route("/api/admin/stats", get(admin::stats))
}
