//! JSON file database.
//!
//! # Storage
//!
//! The whole store is one JSON document on disk:
//!
//! ```text
//! { "products": [...], "categories": [...], "orders": [...], "users": [...],
//!   "blogPosts": [...], "reviews": [...], "coupons": [...], "settings": {...} }
//! ```
//!
//! Every key is optional on read. A request that changes data goes through
//! [`JsonFileDb::mutate`], which reads the file, applies the change to the
//! parsed [`Database`] and writes the whole document back. Writers inside
//! one process are serialized by an async mutex; the file itself is replaced
//! by renaming a fully written temporary file, so readers never see a
//! half-written document.

mod repository;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use ashpazkhoone_core::models::{
    BlogPost, Category, Coupon, Order, Product, RecordError, Review, SiteSettings, User,
};

pub use repository::Stored;

/// Errors from the file database and its repositories.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Reading or writing the data file failed.
    #[error("data file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The data file is not a valid database document.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested record was not found.
    #[error("not found")]
    NotFound,

    /// Unique key already taken (slug, email, coupon code).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The submitted record is malformed or breaks a rule.
    #[error("invalid record: {0}")]
    Invalid(String),
}

impl From<RecordError> for RepositoryError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Invalid(e) => Self::Invalid(e.to_string()),
            other => Self::Invalid(other.to_string()),
        }
    }
}

/// The whole database document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Database {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub orders: Vec<Order>,
    pub users: Vec<User>,
    pub blog_posts: Vec<BlogPost>,
    pub reviews: Vec<Review>,
    pub coupons: Vec<Coupon>,
    #[serde(deserialize_with = "SiteSettings::deserialize_any_shape")]
    pub settings: SiteSettings,
}

impl Database {
    /// Parse a database document, migrating older settings shapes.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::DataCorruption`] if the bytes are not a
    /// valid document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RepositoryError> {
        serde_json::from_slice(bytes).map_err(|e| RepositoryError::DataCorruption(e.to_string()))
    }

    /// Parse a database document from an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::DataCorruption`] if the value is not a
    /// valid document.
    pub fn from_value(value: serde_json::Value) -> Result<Self, RepositoryError> {
        serde_json::from_value(value).map_err(|e| RepositoryError::DataCorruption(e.to_string()))
    }
}

/// Handle to the JSON data file.
#[derive(Debug)]
pub struct JsonFileDb {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileDb {
    /// Use the data file at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the data file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the whole data file. A missing file is an empty database.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the file cannot be read or parsed.
    pub async fn read(&self) -> Result<Database, RepositoryError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Database::default()),
            Ok(bytes) => Database::from_slice(&bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Database::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read, change and write back the database.
    ///
    /// Nothing is written when `f` fails.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or a [`RepositoryError`] converted into
    /// `E` if the file cannot be read or written.
    pub async fn mutate<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Database) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut db = self.read().await?;
        let out = f(&mut db)?;
        self.write(&db).await?;
        Ok(out)
    }

    /// Replace the whole database, keeping the previous file as
    /// `<name>.pre-restore`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Io`] if a file operation fails.
    pub async fn replace(&self, db: &Database) -> Result<(), RepositoryError> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::copy(&self.path, self.sibling("pre-restore")).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.write(db).await
    }

    /// Whether the data file can currently be read and parsed.
    pub async fn is_readable(&self) -> bool {
        self.read().await.is_ok()
    }

    /// Write `db` to a temporary file, then rename it over the data file.
    async fn write(&self, db: &Database) -> Result<(), RepositoryError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(db)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let tmp = self.sibling("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!(path = %self.path.display(), "data file written");
        Ok(())
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }
}
