//! Coupon routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ashpazkhoone_core::models::{Coupon, CouponError};
use ashpazkhoone_core::{CouponId, Price};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Coupon>>> {
    let mut coupons = state.db().read().await?.coupons;
    coupons.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(Json(coupons))
}

pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Coupon>)> {
    let coupon: Coupon = state
        .db()
        .mutate(|db| db.create(body, Utc::now()))
        .await?;
    tracing::info!(admin_id = %admin.id, code = %coupon.code, "coupon created");
    Ok((StatusCode::CREATED, Json(coupon)))
}

pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(patch): Json<Value>,
) -> Result<Json<Coupon>> {
    let coupon: Coupon = state
        .db()
        .mutate(|db| db.update(CouponId::new(id), &patch, Utc::now()))
        .await?;
    Ok(Json(coupon))
}

pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state
        .db()
        .mutate(|db| db.delete::<Coupon>(CouponId::new(id)).map(drop))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub code: String,
    pub subtotal: Price,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub code: String,
    pub discount: Price,
}

/// Check a coupon against a subtotal without counting a use.
pub async fn validate(
    State(state): State<AppState>,
    Json(body): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>> {
    let db = state.db().read().await?;
    let coupon = db
        .coupons
        .iter()
        .find(|c| c.matches(&body.code))
        .ok_or(CouponError::NotFound)
        .and_then(|c| c.discount_for(body.subtotal, Utc::now()).map(|d| (c, d)));
    // Every rejection is a 400 here; the reason is the message.
    let (coupon, discount) = coupon.map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(Json(ValidateResponse {
        code: coupon.code.clone(),
        discount,
    }))
}
