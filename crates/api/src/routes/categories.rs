//! Category routes.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use ashpazkhoone_core::CategoryId;
use ashpazkhoone_core::models::category::sort_for_display;
use ashpazkhoone_core::models::{Category, Product};

use crate::db::{Database, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    /// Detach products from the category instead of refusing.
    #[serde(default)]
    pub force: bool,
}

/// A `parentId` that is set must name an existing top-level category, and a
/// category with children cannot itself get a parent. Nesting is one level.
fn ensure_parent(db: &Database, category: &Category) -> std::result::Result<(), RepositoryError> {
    let Some(parent_id) = category.parent_id else {
        return Ok(());
    };
    let parent = db.find::<Category>(parent_id).ok_or_else(|| {
        RepositoryError::Invalid(format!("parent category {parent_id} does not exist"))
    })?;
    if parent.parent_id.is_some() {
        return Err(RepositoryError::Invalid(format!(
            "parent category {parent_id} is itself a subcategory"
        )));
    }
    if db
        .all::<Category>()
        .iter()
        .any(|c| c.parent_id == Some(category.id))
    {
        return Err(RepositoryError::Invalid(
            "a category with subcategories cannot have a parent".to_string(),
        ));
    }
    Ok(())
}

pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let mut categories = state.db().read().await?.categories;
    sort_for_display(&mut categories);
    Ok(Json(categories))
}

pub async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Category>> {
    let db = state.db().read().await?;
    Ok(Json(db.get::<Category>(CategoryId::new(id))?.clone()))
}

pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = state
        .db()
        .mutate(|db| {
            let category: Category = db.create(body, Utc::now())?;
            ensure_parent(db, &category)?;
            Ok::<_, AppError>(category)
        })
        .await?;
    tracing::info!(admin_id = %admin.id, category_id = %category.id, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(patch): Json<Value>,
) -> Result<Json<Category>> {
    let category = state
        .db()
        .mutate(|db| {
            let category: Category = db.update(CategoryId::new(id), &patch, Utc::now())?;
            ensure_parent(db, &category)?;
            Ok::<_, AppError>(category)
        })
        .await?;
    Ok(Json(category))
}

/// Delete a category.
///
/// Refused with 409 while products use it, unless `?force=true`, which
/// clears their category. Child categories move to the top level.
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode> {
    let id = CategoryId::new(id);
    let detached = state
        .db()
        .mutate(|db| {
            db.get::<Category>(id)?;
            let in_use = db
                .products
                .iter()
                .filter(|p| p.category_id == Some(id))
                .count();
            if in_use > 0 && !params.force {
                return Err(AppError::Conflict(format!(
                    "category is used by {in_use} product(s)"
                )));
            }
            let now = Utc::now();
            for product in db.products.iter_mut().filter(|p| p.category_id == Some(id)) {
                detach(product, now);
            }
            for child in db.categories.iter_mut().filter(|c| c.parent_id == Some(id)) {
                child.parent_id = None;
            }
            db.delete::<Category>(id)?;
            Ok(in_use)
        })
        .await?;
    tracing::info!(admin_id = %admin.id, category_id = %id, detached, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn detach(product: &mut Product, now: chrono::DateTime<Utc>) {
    product.category_id = None;
    product.updated_at = now;
}
