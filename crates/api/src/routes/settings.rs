//! Site settings.

use axum::{Json, extract::State};
use serde_json::Value;

use ashpazkhoone_core::models::settings::CURRENT_SCHEMA_VERSION;
use ashpazkhoone_core::models::{SiteSettings, migrate_settings};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Keys only the sectioned shape has.
const SECTION_KEYS: &[&str] = &["general", "contact", "social", "shipping", "payment"];

pub async fn show(State(state): State<AppState>) -> Result<Json<SiteSettings>> {
    Ok(Json(state.db().read().await?.settings))
}

/// Replace the settings. Legacy flat bodies are migrated; sectioned bodies
/// without a `schemaVersion` are read as the current shape.
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(mut body): Json<Value>,
) -> Result<Json<SiteSettings>> {
    if let Value::Object(map) = &mut body
        && !map.contains_key("schemaVersion")
        && SECTION_KEYS.iter().any(|k| map.contains_key(*k))
    {
        map.insert("schemaVersion".to_string(), CURRENT_SCHEMA_VERSION.into());
    }
    let settings = migrate_settings(body)
        .map_err(|e| AppError::BadRequest(e.to_string()))?
        .settings;

    let saved = state
        .db()
        .mutate(|db| {
            db.settings = settings;
            Ok::<_, AppError>(db.settings.clone())
        })
        .await?;
    tracing::info!(admin_id = %admin.id, "site settings updated");
    Ok(Json(saved))
}
