//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::JsonFileDb;
use crate::services::uploads::Uploads;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    db: JsonFileDb,
    uploads: Uploads,
}

impl AppState {
    /// Create the state from configuration.
    ///
    /// Opens nothing; the data file is created on first write.
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        let db = JsonFileDb::new(config.data_file.clone());
        let uploads = Uploads::new(config.upload_dir.clone(), config.max_upload_bytes);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                uploads,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// The JSON file database.
    #[must_use]
    pub fn db(&self) -> &JsonFileDb {
        &self.inner.db
    }

    #[must_use]
    pub fn uploads(&self) -> &Uploads {
        &self.inner.uploads
    }
}
