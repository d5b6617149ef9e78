//! Account registration and login.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;

use ashpazkhoone_core::UserRole;
use ashpazkhoone_core::models::{User, UserView};

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth::{AuthService, NewAccount};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn start_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user))
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Create a customer account and log it in.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserView>)> {
    let user = AuthService::new(state.db())
        .register(NewAccount {
            name: &body.name,
            email: &body.email,
            password: &body.password,
            phone: body.phone.as_deref(),
            role: UserRole::Customer,
        })
        .await?;
    start_session(&session, &user).await?;
    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<UserView>> {
    let user = AuthService::new(state.db())
        .login(&body.email, &body.password)
        .await
        .inspect_err(|_| tracing::info!("login failed"))?;
    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "logged in");
    Ok(Json(UserView::from(&user)))
}

pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The logged-in user, read fresh from the data file.
pub async fn me(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
) -> Result<Json<UserView>> {
    let db = state.db().read().await?;
    let Some(user) = db.find::<User>(current.id) else {
        // Account deleted while the session was alive.
        if let Err(e) = clear_current_user(&session).await {
            tracing::warn!(error = %e, "failed to flush session of deleted user");
        }
        return Err(AppError::Unauthorized("Login required".to_string()));
    };
    Ok(Json(UserView::from(user)))
}
