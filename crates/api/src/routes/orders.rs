//! Cart pricing, checkout and order management.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use ashpazkhoone_core::cart::{CartLine, CheckoutQuote};
use ashpazkhoone_core::catalog::{Page, PageRequest};
use ashpazkhoone_core::models::{Order, StatusChange};
use ashpazkhoone_core::{OrderId, OrderStatus, PaymentStatus};

use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAdmin, RequireAuth};
use crate::services::checkout::{self, CheckoutRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// Price a cart without placing an order.
pub async fn quote(
    State(state): State<AppState>,
    Json(body): Json<QuoteRequest>,
) -> Result<Json<CheckoutQuote>> {
    let db = state.db().read().await?;
    let quote = checkout::quote_cart(&db, &body.items, body.coupon_code.as_deref(), Utc::now())?;
    Ok(Json(quote))
}

/// Place an order. Logged-in customers get it linked to their account.
pub async fn create(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let user_id = user.map(|u| u.id);
    let order = state
        .db()
        .mutate(|db| checkout::place_order(db, body, user_id, Utc::now()))
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Deserialize)]
pub struct TrackParams {
    pub number: String,
    pub phone: String,
}

/// What an anonymous visitor may see of an order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedOrder {
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub status_history: Vec<StatusChange>,
    pub item_count: u32,
    pub total: ashpazkhoone_core::Price,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<&Order> for TrackedOrder {
    fn from(order: &Order) -> Self {
        Self {
            order_number: order.order_number.clone(),
            status: order.status,
            payment_status: order.payment_status,
            status_history: order.status_history.clone(),
            item_count: order.item_count(),
            total: order.total,
            created_at: order.created_at,
        }
    }
}

pub async fn track(
    State(state): State<AppState>,
    Query(params): Query<TrackParams>,
) -> Result<Json<TrackedOrder>> {
    let db = state.db().read().await?;
    checkout::track(&db, &params.number, &params.phone)
        .map(|order| Json(TrackedOrder::from(order)))
        .ok_or_else(|| AppError::NotFound("No order matches this number and phone".to_string()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub status: Option<OrderStatus>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// All orders, newest first.
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Order>>> {
    let db = state.db().read().await?;
    let mut orders: Vec<Order> = db
        .orders
        .into_iter()
        .filter(|o| params.status.is_none_or(|s| o.status == s))
        .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(Json(
        PageRequest::new(params.page, params.per_page).paginate(orders),
    ))
}

/// An order, for an admin or the customer who placed it.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i64>,
) -> Result<Json<Order>> {
    let db = state.db().read().await?;
    let order = db.get::<Order>(OrderId::new(id))?;
    if !user.is_admin() && order.user_id != Some(user.id) {
        // Same answer as a missing order so ids cannot be probed.
        return Err(AppError::NotFound("Not found".to_string()));
    }
    Ok(Json(order.clone()))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub note: Option<String>,
}

pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Order>> {
    let order = state
        .db()
        .mutate(|db| {
            checkout::change_status(db, OrderId::new(id), body.status, body.note, Utc::now())
        })
        .await?;
    tracing::info!(
        admin_id = %admin.id,
        order_id = %order.id,
        status = %order.status,
        "order status changed"
    );
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub payment_status: PaymentStatus,
}

pub async fn update_payment(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(body): Json<PaymentRequest>,
) -> Result<Json<Order>> {
    let order = state
        .db()
        .mutate(|db| {
            checkout::set_payment_status(db, OrderId::new(id), body.payment_status, Utc::now())
        })
        .await?;
    Ok(Json(order))
}

pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    let id = OrderId::new(id);
    state
        .db()
        .mutate(|db| db.delete::<Order>(id).map(drop))
        .await?;
    tracing::info!(admin_id = %admin.id, order_id = %id, "order deleted");
    Ok(StatusCode::NO_CONTENT)
}
