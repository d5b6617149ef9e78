//! Back-office routes: backup, restore and dashboard figures.

use axum::{
    Json,
    extract::State,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::services::backup::{BackupEnvelope, parse_restore};
use crate::services::stats::DashboardStats;
use crate::state::AppState;

/// Download the whole database.
pub async fn backup(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Response> {
    let envelope = BackupEnvelope::new(state.db().read().await?, Utc::now());
    let disposition = format!("attachment; filename=\"{}\"", envelope.file_name());
    tracing::info!(admin_id = %admin.id, "backup downloaded");

    let mut response = Json(envelope).into_response();
    let value = HeaderValue::from_str(&disposition)
        .map_err(|e| AppError::Internal(format!("invalid content-disposition: {e}")))?;
    response
        .headers_mut()
        .insert(header::CONTENT_DISPOSITION, value);
    Ok(response)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSummary {
    pub products: usize,
    pub categories: usize,
    pub orders: usize,
    pub users: usize,
    pub blog_posts: usize,
    pub reviews: usize,
    pub coupons: usize,
}

/// Replace the database with an uploaded backup.
pub async fn restore(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<Value>,
) -> Result<Json<RestoreSummary>> {
    let data = parse_restore(body)?;
    if !data.users.iter().any(|u| u.is_admin()) {
        return Err(AppError::BadRequest(
            "backup has no admin account; restoring it would lock you out".to_string(),
        ));
    }
    state.db().replace(&data).await?;

    let summary = RestoreSummary {
        products: data.products.len(),
        categories: data.categories.len(),
        orders: data.orders.len(),
        users: data.users.len(),
        blog_posts: data.blog_posts.len(),
        reviews: data.reviews.len(),
        coupons: data.coupons.len(),
    };
    tracing::warn!(admin_id = %admin.id, ?summary, "database restored from backup");
    Ok(Json(summary))
}

pub async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<DashboardStats>> {
    let db = state.db().read().await?;
    Ok(Json(DashboardStats::compute(&db)))
}
