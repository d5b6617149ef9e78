//! Review submission and moderation.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;

use ashpazkhoone_core::models::{Entity, Product, Review, next_id};
use ashpazkhoone_core::{ProductId, ReviewId, ReviewStatus};

use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAdmin};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub product_id: ProductId,
    /// Defaults to the account name for logged-in users.
    #[serde(default)]
    pub name: Option<String>,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

/// Submit a review. It stays hidden until an admin approves it.
pub async fn create(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<NewReview>,
) -> Result<(StatusCode, Json<Review>)> {
    let name = body
        .name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| user.as_ref().map(|u| u.name.clone()))
        .ok_or_else(|| AppError::BadRequest("reviewer name is required".to_string()))?;

    let review = state
        .db()
        .mutate(|db| {
            if db.find::<Product>(body.product_id).is_none_or(|p| !p.active) {
                return Err(AppError::NotFound("Product not found".to_string()));
            }
            let mut review = Review {
                id: next_id(&db.reviews),
                product_id: body.product_id,
                user_id: user.as_ref().map(|u| u.id),
                name,
                rating: body.rating,
                comment: body.comment,
                status: ReviewStatus::Pending,
                created_at: Utc::now(),
            };
            review.normalize();
            review
                .validate()
                .map_err(|e| RepositoryError::Invalid(e.to_string()))?;
            Ok(db.insert(review)?)
        })
        .await?;
    tracing::info!(review_id = %review.id, product_id = %review.product_id, "review submitted");
    Ok((StatusCode::CREATED, Json(review)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub status: Option<ReviewStatus>,
    pub product_id: Option<i64>,
}

/// All reviews, newest first.
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Review>>> {
    let mut reviews: Vec<Review> = state
        .db()
        .read()
        .await?
        .reviews
        .into_iter()
        .filter(|r| params.status.is_none_or(|s| r.status == s))
        .filter(|r| {
            params
                .product_id
                .is_none_or(|p| r.product_id == ProductId::new(p))
        })
        .collect();
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(Json(reviews))
}

#[derive(Debug, Deserialize)]
pub struct ModerateRequest {
    pub status: ReviewStatus,
}

pub async fn moderate(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(body): Json<ModerateRequest>,
) -> Result<Json<Review>> {
    let review = state
        .db()
        .mutate(|db| {
            let review = db
                .find_mut::<Review>(ReviewId::new(id))
                .ok_or(RepositoryError::NotFound)?;
            review.status = body.status;
            Ok::<_, RepositoryError>(review.clone())
        })
        .await?;
    tracing::info!(admin_id = %admin.id, review_id = %review.id, status = ?review.status, "review moderated");
    Ok(Json(review))
}

pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state
        .db()
        .mutate(|db| db.delete::<Review>(ReviewId::new(id)).map(drop))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
