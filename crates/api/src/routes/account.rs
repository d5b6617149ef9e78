//! The logged-in customer's own data.

use axum::{Json, extract::State};

use ashpazkhoone_core::models::Order;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Orders placed by the current user, newest first.
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let db = state.db().read().await?;
    let mut orders: Vec<Order> = db
        .orders
        .into_iter()
        .filter(|o| o.user_id == Some(user.id))
        .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(Json(orders))
}
