//! Blog routes.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use ashpazkhoone_core::BlogPostId;
use ashpazkhoone_core::models::BlogPost;

use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAdmin};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Include drafts (admin only).
    #[serde(default)]
    pub all: bool,
    pub tag: Option<String>,
}

fn post_id(key: &str) -> Result<BlogPostId> {
    key.parse::<i64>()
        .map(BlogPostId::new)
        .map_err(|_| AppError::BadRequest("post id must be a number".to_string()))
}

/// Posts, newest first. Drafts sort by their last edit.
pub async fn index(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<BlogPost>>> {
    let include_drafts = params.all && auth.is_admin();
    let mut posts: Vec<BlogPost> = state
        .db()
        .read()
        .await?
        .blog_posts
        .into_iter()
        .filter(|p| p.published || include_drafts)
        .filter(|p| params.tag.as_ref().is_none_or(|t| p.tags.contains(t)))
        .collect();
    posts.sort_by(|a, b| {
        b.published_at
            .unwrap_or(b.updated_at)
            .cmp(&a.published_at.unwrap_or(a.updated_at))
    });
    Ok(Json(posts))
}

pub async fn show(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Path(slug): Path<String>,
) -> Result<Json<BlogPost>> {
    let db = state.db().read().await?;
    db.find_by_key::<BlogPost>(&slug.to_lowercase())
        .filter(|p| p.published || auth.is_admin())
        .map(|p| Json(p.clone()))
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
}

pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<BlogPost>)> {
    let post: BlogPost = state
        .db()
        .mutate(|db| db.create(body, Utc::now()))
        .await?;
    tracing::info!(admin_id = %admin.id, post_id = %post.id, "blog post created");
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(key): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<BlogPost>> {
    let id = post_id(&key)?;
    let post: BlogPost = state
        .db()
        .mutate(|db| db.update(id, &patch, Utc::now()))
        .await?;
    Ok(Json(post))
}

pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(key): Path<String>,
) -> Result<StatusCode> {
    let id = post_id(&key)?;
    state
        .db()
        .mutate(|db| db.delete::<BlogPost>(id).map(drop))
        .await?;
    tracing::info!(admin_id = %admin.id, post_id = %id, "blog post deleted");
    Ok(StatusCode::NO_CONTENT)
}
