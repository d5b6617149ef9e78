//! CLI error type.

use std::path::PathBuf;

use ashpazkhoone_api::db::RepositoryError;
use ashpazkhoone_api::services::auth::AuthError;
use ashpazkhoone_core::local::{LocalDbError, StoreError};
use ashpazkhoone_core::models::SettingsError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Data file could not be read, parsed or written.
    #[error("data file error: {0}")]
    Repository(#[from] RepositoryError),

    /// Account could not be created.
    #[error("account error: {0}")]
    Auth(#[from] AuthError),

    /// Client-side store failed.
    #[error("local store error: {0}")]
    LocalDb(#[from] LocalDbError),

    /// Stored settings could not be migrated.
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// File outside the data file could not be read or written.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input file is not valid JSON.
    #[error("{}: invalid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// `init` would overwrite existing data.
    #[error("{} already exists; pass --force to overwrite it", .0.display())]
    AlreadyInitialized(PathBuf),

    /// Restoring this backup would leave no way to log in.
    #[error("backup has no admin account")]
    NoAdmin,

    /// `local import` found nothing under the prefix.
    #[error("no stored data under prefix {prefix:?} in {}", dir.display())]
    EmptyStore { dir: PathBuf, prefix: String },
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        Self::LocalDb(err.into())
    }
}

impl CliError {
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
