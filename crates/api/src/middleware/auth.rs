//! Authentication extractors.
//!
//! Every route that needs a logged-in user takes one of these extractors.
//! Rejections are JSON bodies in the same `{ "error": ... }` shape as
//! [`crate::error::AppError`].

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use ashpazkhoone_core::models::User;

use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor that requires a logged-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a logged-in admin.
pub struct RequireAdmin(pub CurrentUser);

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject anonymous requests.
pub struct OptionalAuth(pub Option<CurrentUser>);

/// Error returned when the request lacks the required identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// Not logged in.
    Unauthorized,
    /// Logged in, but not an admin.
    Forbidden,
    /// The data file could not be read to check the session.
    Unavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Login required"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Admin access required"),
            Self::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable"),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Load the session user and check it against the data file.
///
/// The role and name come from the stored account, not from the copy taken
/// at login. A session whose account is gone, or whose id now belongs to a
/// different email after a restore, is flushed.
async fn current_user(
    parts: &Parts,
    state: &AppState,
) -> Result<Option<CurrentUser>, AuthRejection> {
    let Some(session) = parts.extensions.get::<Session>() else {
        return Ok(None);
    };
    let Some(cached) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
    else {
        return Ok(None);
    };

    let db = state.db().read().await.map_err(|e| {
        tracing::error!(error = %e, "failed to load session user");
        AuthRejection::Unavailable
    })?;

    let Some(user) = db
        .find::<User>(cached.id)
        .filter(|user| user.email == cached.email)
    else {
        tracing::info!(user_id = %cached.id, "session user no longer exists");
        if let Err(e) = clear_current_user(session).await {
            tracing::warn!(error = %e, "failed to flush stale session");
        }
        return Ok(None);
    };

    let fresh = CurrentUser::from(user);
    if fresh != cached {
        tracing::info!(user_id = %fresh.id, role = %fresh.role, "session user changed");
        if let Err(e) = session.insert(session_keys::CURRENT_USER, &fresh).await {
            tracing::warn!(error = %e, "failed to refresh session user");
        }
    }
    Ok(Some(fresh))
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        current_user(parts, state)
            .await?
            .map(Self)
            .ok_or(AuthRejection::Unauthorized)
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = current_user(parts, state)
            .await?
            .ok_or(AuthRejection::Unauthorized)?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, path = %parts.uri.path(), "non-admin on admin route");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts, state).await?))
    }
}

impl OptionalAuth {
    /// Whether the caller is a logged-in admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.0.as_ref().is_some_and(CurrentUser::is_admin)
    }
}

/// Helper to set the current user in the session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
