//! Account management (admin).

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use ashpazkhoone_core::models::{User, UserView};
use ashpazkhoone_core::{Phone, UserId, UserRole};

use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Fields an admin may change. Email and password stay with the account owner.
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    /// Empty string clears the phone number.
    pub phone: Option<String>,
    pub role: Option<UserRole>,
}

pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<UserView>>> {
    let db = state.db().read().await?;
    Ok(Json(db.users.iter().map(UserView::from).collect()))
}

pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Json<UserView>> {
    let db = state.db().read().await?;
    Ok(Json(UserView::from(db.get::<User>(UserId::new(id))?)))
}

pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(body): Json<UserUpdate>,
) -> Result<Json<UserView>> {
    let id = UserId::new(id);
    if id == admin.id && body.role.is_some_and(|r| r != UserRole::Admin) {
        return Err(AppError::BadRequest(
            "You cannot remove your own admin role".to_string(),
        ));
    }
    let name = match body.name.as_deref().map(str::trim) {
        Some("") => return Err(AppError::BadRequest("name is required".to_string())),
        other => other.map(str::to_owned),
    };
    let phone = match body.phone.as_deref().map(str::trim) {
        None => None,
        Some("") => Some(None),
        Some(raw) => Some(Some(
            Phone::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))?,
        )),
    };

    let user = state
        .db()
        .mutate(|db| {
            let user = db.find_mut::<User>(id).ok_or(RepositoryError::NotFound)?;
            if let Some(name) = name {
                user.name = name;
            }
            if let Some(phone) = phone {
                user.phone = phone;
            }
            if let Some(role) = body.role {
                user.role = role;
            }
            Ok::<_, RepositoryError>(UserView::from(&*user))
        })
        .await?;
    tracing::info!(admin_id = %admin.id, user_id = %user.id, role = %user.role, "user updated");
    Ok(Json(user))
}

pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    let id = UserId::new(id);
    if id == admin.id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }
    state
        .db()
        .mutate(|db| db.delete::<User>(id).map(drop))
        .await?;
    tracing::info!(admin_id = %admin.id, user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
