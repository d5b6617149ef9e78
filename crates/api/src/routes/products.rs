//! Product catalog routes.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ashpazkhoone_core::catalog::{Page, PageRequest, ProductQuery, ProductSort};
use ashpazkhoone_core::models::{Category, Product, RatingSummary, Review};
use ashpazkhoone_core::{CategoryId, Price, ProductId};

use crate::db::{Database, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAdmin};
use crate::state::AppState;

/// Query string of the product listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// Category id or slug.
    pub category: Option<String>,
    /// Free-text search.
    pub q: Option<String>,
    pub featured: Option<bool>,
    pub in_stock: Option<bool>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort: Option<ProductSort>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    /// Include deactivated products (admin only).
    #[serde(alias = "all")]
    pub include_inactive: Option<bool>,
}

/// Resolve a category given by id or slug.
fn resolve_category(db: &Database, key: &str) -> Option<CategoryId> {
    let key = key.trim();
    if let Ok(id) = key.parse::<i64>() {
        return Some(CategoryId::new(id));
    }
    db.find_by_key::<Category>(&key.to_lowercase())
        .map(|c| c.id)
}

/// A `categoryId` that is set must name an existing category.
fn ensure_category(db: &Database, product: &Product) -> std::result::Result<(), RepositoryError> {
    match product.category_id {
        Some(id) if db.find::<Category>(id).is_none() => Err(RepositoryError::Invalid(format!(
            "category {id} does not exist"
        ))),
        _ => Ok(()),
    }
}

pub async fn index(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Product>>> {
    let db = state.db().read().await?;
    let pages = PageRequest::new(params.page, params.per_page);

    let category = match params.category.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(key) => match resolve_category(&db, key) {
            Some(id) => Some(id),
            // Unknown slug: nothing can match.
            None => return Ok(Json(pages.paginate(Vec::new()))),
        },
        None => None,
    };

    let query = ProductQuery {
        category,
        text: params.q.filter(|q| !q.trim().is_empty()),
        featured: params.featured,
        in_stock: params.in_stock,
        min_price: params.min_price.map(Price::new),
        max_price: params.max_price.map(Price::new),
        include_inactive: params.include_inactive.unwrap_or(false) && auth.is_admin(),
        sort: params.sort.unwrap_or_default(),
    };
    let hits = query.apply(&db.products);
    Ok(Json(pages.paginate(hits).map(Product::clone)))
}

fn visible(product: &Product, auth: &OptionalAuth) -> Result<Product> {
    if product.active || auth.is_admin() {
        Ok(product.clone())
    } else {
        Err(AppError::NotFound("Product not found".to_string()))
    }
}

pub async fn show(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Path(id): Path<i64>,
) -> Result<Json<Product>> {
    let db = state.db().read().await?;
    let product = db
        .find::<Product>(ProductId::new(id))
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    Ok(Json(visible(product, &auth)?))
}

pub async fn show_by_slug(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Path(slug): Path<String>,
) -> Result<Json<Product>> {
    let db = state.db().read().await?;
    let product = db
        .find_by_key::<Product>(&slug.to_lowercase())
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    Ok(Json(visible(product, &auth)?))
}

#[derive(Debug, Serialize)]
pub struct ProductReviews {
    pub reviews: Vec<Review>,
    #[serde(flatten)]
    pub summary: RatingSummary,
}

/// Approved reviews of a product with its average rating.
pub async fn reviews(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProductReviews>> {
    let id = ProductId::new(id);
    let db = state.db().read().await?;
    db.get::<Product>(id)?;

    let mut reviews: Vec<Review> = db
        .reviews
        .into_iter()
        .filter(|r| r.product_id == id && r.is_public())
        .collect();
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let summary = RatingSummary::of(&reviews);
    Ok(Json(ProductReviews { reviews, summary }))
}

pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state
        .db()
        .mutate(|db| {
            let product: Product = db.create(body, Utc::now())?;
            ensure_category(db, &product)?;
            Ok::<_, AppError>(product)
        })
        .await?;
    tracing::info!(admin_id = %admin.id, product_id = %product.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(patch): Json<Value>,
) -> Result<Json<Product>> {
    let product = state
        .db()
        .mutate(|db| {
            let product: Product = db.update(ProductId::new(id), &patch, Utc::now())?;
            ensure_category(db, &product)?;
            Ok::<_, AppError>(product)
        })
        .await?;
    tracing::info!(admin_id = %admin.id, product_id = %product.id, "product updated");
    Ok(Json(product))
}

/// Delete a product and its reviews. Past orders keep their copied lines.
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    let id = ProductId::new(id);
    state
        .db()
        .mutate(|db| {
            db.delete::<Product>(id)?;
            db.reviews.retain(|r| r.product_id != id);
            Ok::<_, AppError>(())
        })
        .await?;
    tracing::info!(admin_id = %admin.id, product_id = %id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}
