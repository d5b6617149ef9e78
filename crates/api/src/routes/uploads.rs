//! Image upload routes.

use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::services::uploads::{StoredUpload, UploadError};
use crate::state::AppState;

/// Multipart field names accepted for the image.
const FILE_FIELDS: &[&str] = &["image", "file"];

fn multipart_error(err: &MultipartError, max: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge { max }.into()
    } else {
        AppError::BadRequest(err.body_text())
    }
}

/// Store the first `image` or `file` field of a multipart form.
pub async fn upload(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredUpload>)> {
    let max = state.uploads().max_bytes();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e, max))?
    {
        if !field.name().is_some_and(|n| FILE_FIELDS.contains(&n)) {
            continue;
        }
        let bytes = field.bytes().await.map_err(|e| multipart_error(&e, max))?;
        let stored = state.uploads().store(&bytes).await?;
        tracing::debug!(admin_id = %admin.id, url = %stored.url, "multipart upload stored");
        return Ok((StatusCode::CREATED, Json(stored)));
    }
    Err(UploadError::Empty.into())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataUrlUpload {
    pub data_url: String,
}

/// Store an image sent as a base64 data URL.
pub async fn upload_base64(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(body): Json<DataUrlUpload>,
) -> Result<(StatusCode, Json<StoredUpload>)> {
    let stored = state.uploads().store_data_url(&body.data_url).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(name): Path<String>,
) -> Result<StatusCode> {
    state.uploads().delete(&name).await?;
    tracing::info!(admin_id = %admin.id, name = %name, "upload removed by admin");
    Ok(StatusCode::NO_CONTENT)
}
