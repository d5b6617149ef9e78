//! Image uploads.
//!
//! Clients resize images before uploading and send them as multipart form
//! data. When the resize step fails in the browser they send the original
//! image as a base64 data URL instead. Both paths end in [`Uploads::store`],
//! which checks the size, sniffs the real file type from its first bytes and
//! writes the file under a generated name.

use std::io::ErrorKind;
use std::path::PathBuf;

use axum::http::StatusCode;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use serde::Serialize;

/// Public URL prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Errors from storing or removing uploads.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no file was uploaded")]
    Empty,
    #[error("only PNG, JPEG, GIF and WebP images are accepted")]
    UnsupportedType,
    #[error("file is larger than {max} bytes")]
    TooLarge { max: usize },
    #[error("invalid data URL: {0}")]
    InvalidDataUrl(&'static str),
    #[error("invalid file name")]
    InvalidName,
    #[error("upload not found")]
    NotFound,
    #[error("upload storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    pub(crate) const fn is_server_error(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    pub(crate) const fn status(&self) -> StatusCode {
        match self {
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageKind {
    /// Identify an image by its magic bytes.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP".as_slice()) {
            Some(Self::Webp)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }

    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}

/// A stored upload, as returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUpload {
    pub url: String,
    pub name: String,
    pub size: usize,
    pub content_type: &'static str,
}

/// The upload directory.
#[derive(Debug, Clone)]
pub struct Uploads {
    dir: PathBuf,
    max_bytes: usize,
}

impl Uploads {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    /// Largest accepted file in bytes.
    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validate and write an image.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Empty`], [`UploadError::TooLarge`] or
    /// [`UploadError::UnsupportedType`] for rejected files and
    /// [`UploadError::Io`] if the file cannot be written.
    pub async fn store(&self, bytes: &[u8]) -> Result<StoredUpload, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                max: self.max_bytes,
            });
        }
        let kind = ImageKind::sniff(bytes).ok_or(UploadError::UnsupportedType)?;

        let name = format!(
            "{}-{:08x}.{}",
            Utc::now().timestamp_millis(),
            rand::random::<u32>(),
            kind.extension()
        );
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&name), bytes).await?;
        tracing::info!(name = %name, size = bytes.len(), "image uploaded");

        Ok(StoredUpload {
            url: format!("{PUBLIC_PREFIX}/{name}"),
            name,
            size: bytes.len(),
            content_type: kind.content_type(),
        })
    }

    /// Decode a `data:image/...;base64,...` URL and store it.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidDataUrl`] for a malformed URL, otherwise
    /// the errors of [`Uploads::store`].
    pub async fn store_data_url(&self, data_url: &str) -> Result<StoredUpload, UploadError> {
        let payload = data_url_payload(data_url)?;
        // Four base64 characters carry three bytes.
        if payload.len() / 4 * 3 > self.max_bytes.saturating_add(3) {
            return Err(UploadError::TooLarge {
                max: self.max_bytes,
            });
        }
        let bytes = STANDARD
            .decode(payload)
            .map_err(|_| UploadError::InvalidDataUrl("payload is not valid base64"))?;
        self.store(&bytes).await
    }

    /// Remove a stored upload by file name.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidName`] for names that are not plain file
    /// names and [`UploadError::NotFound`] if there is no such file.
    pub async fn delete(&self, name: &str) -> Result<(), UploadError> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(UploadError::InvalidName);
        }
        match tokio::fs::remove_file(self.dir.join(name)).await {
            Ok(()) => {
                tracing::info!(name = %name, "upload deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(UploadError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

/// The base64 part of an image data URL.
fn data_url_payload(data_url: &str) -> Result<&str, UploadError> {
    let rest = data_url
        .trim()
        .strip_prefix("data:")
        .ok_or(UploadError::InvalidDataUrl("missing data: prefix"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or(UploadError::InvalidDataUrl("missing comma"))?;
    let mut parts = meta.split(';');
    let media_type = parts.next().unwrap_or_default();
    if !media_type.starts_with("image/") {
        return Err(UploadError::UnsupportedType);
    }
    if !parts.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(UploadError::InvalidDataUrl("only base64 data URLs are accepted"));
    }
    Ok(payload)
}
