//! Data file commands: init, backup, restore and settings migration.
//!
//! # Usage
//!
//! ```bash
//! ak-cli init [--force]
//! ak-cli backup -o backup.json
//! ak-cli restore -i backup.json
//! ak-cli settings migrate
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use ashpazkhoone_api::db::{Database, JsonFileDb, RepositoryError};
use ashpazkhoone_api::services::backup::{BackupEnvelope, parse_restore};
use ashpazkhoone_core::models::{Category, User, migrate_settings as migrate_stored_settings};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::error::CliError;

/// Categories a fresh data file starts with: name, slug, description.
const SAMPLE_CATEGORIES: &[(&str, &str, &str)] = &[
    ("ظروف پخت", "cookware", "قابلمه، ماهیتابه و تابه"),
    ("ابزار آشپزخانه", "kitchen-tools", "کفگیر، چاقو و وسایل آماده‌سازی"),
    ("لوازم برقی", "appliances", "لوازم برقی کوچک آشپزخانه"),
    ("سرو و پذیرایی", "serveware", "ظروف سرو، سینی و لیوان"),
];

/// A database with default settings and the sample categories.
///
/// # Errors
///
/// Returns [`RepositoryError`] if a sample category fails validation.
pub fn initial_database(now: DateTime<Utc>) -> Result<Database, RepositoryError> {
    let mut db = Database::default();
    for (position, (name, slug, description)) in SAMPLE_CATEGORIES.iter().enumerate() {
        db.create::<Category>(
            json!({
                "name": name,
                "slug": slug,
                "description": description,
                "sortOrder": position,
            }),
            now,
        )?;
    }
    Ok(db)
}

/// Create the data file.
///
/// # Errors
///
/// Returns [`CliError::AlreadyInitialized`] when the file exists and `force`
/// is not set.
pub async fn init(data_file: &Path, force: bool) -> Result<(), CliError> {
    let exists = tokio::fs::try_exists(data_file)
        .await
        .map_err(CliError::io(data_file))?;
    if exists && !force {
        return Err(CliError::AlreadyInitialized(data_file.to_path_buf()));
    }

    let data = initial_database(Utc::now())?;
    JsonFileDb::new(data_file).replace(&data).await?;

    tracing::info!(
        path = %data_file.display(),
        categories = data.categories.len(),
        overwritten = exists,
        "data file initialized"
    );
    Ok(())
}

/// Write a backup envelope. Returns the path written.
///
/// # Errors
///
/// Returns [`CliError`] if the data file cannot be read or the backup
/// cannot be written.
pub async fn backup(data_file: &Path, output: Option<&Path>) -> Result<PathBuf, CliError> {
    let data = JsonFileDb::new(data_file).read().await?;
    let envelope = BackupEnvelope::new(data, Utc::now());
    let path = output.map_or_else(|| PathBuf::from(envelope.file_name()), Path::to_path_buf);

    let bytes = serde_json::to_vec_pretty(&envelope).map_err(|source| CliError::Json {
        path: path.clone(),
        source,
    })?;
    tokio::fs::write(&path, bytes)
        .await
        .map_err(CliError::io(&path))?;

    tracing::info!(
        path = %path.display(),
        products = envelope.data.products.len(),
        orders = envelope.data.orders.len(),
        users = envelope.data.users.len(),
        "backup written"
    );
    Ok(path)
}

/// Replace the database with a backup file.
///
/// The previous data file is kept as `<name>.pre-restore`.
///
/// # Errors
///
/// Returns [`CliError::NoAdmin`] for a backup without an admin account, and
/// [`CliError`] if the backup cannot be read or parsed.
pub async fn restore(data_file: &Path, input: &Path) -> Result<(), CliError> {
    let bytes = tokio::fs::read(input).await.map_err(CliError::io(input))?;
    let body: Value = serde_json::from_slice(&bytes).map_err(|source| CliError::Json {
        path: input.to_path_buf(),
        source,
    })?;
    let data = parse_restore(body)?;
    if !data.users.iter().any(User::is_admin) {
        return Err(CliError::NoAdmin);
    }

    JsonFileDb::new(data_file).replace(&data).await?;
    tracing::warn!(
        path = %data_file.display(),
        from = %input.display(),
        products = data.products.len(),
        orders = data.orders.len(),
        users = data.users.len(),
        "database restored from backup"
    );
    Ok(())
}

/// Rewrite stored settings in the current shape. Returns whether the file
/// changed.
///
/// # Errors
///
/// Returns [`CliError::Settings`] for settings written by a newer build, and
/// [`CliError`] if the data file cannot be read or written.
pub async fn migrate_settings(data_file: &Path) -> Result<bool, CliError> {
    let bytes = match tokio::fs::read(data_file).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %data_file.display(), "no data file, nothing to migrate");
            return Ok(false);
        }
        Err(e) => return Err(CliError::io(data_file)(e)),
    };
    let document: Value = serde_json::from_slice(&bytes).map_err(|source| CliError::Json {
        path: data_file.to_path_buf(),
        source,
    })?;
    let stored = document
        .get("settings")
        .cloned()
        .unwrap_or_else(|| json!({}));

    let migrated = migrate_stored_settings(stored)?;
    if !migrated.migrated {
        tracing::info!("settings already in the current shape");
        return Ok(false);
    }

    // Reading parses any settings shape; writing back stores the current one.
    JsonFileDb::new(data_file)
        .mutate(|_| Ok::<_, RepositoryError>(()))
        .await?;
    tracing::info!(
        schema_version = migrated.settings.schema_version,
        "settings migrated"
    );
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ashpazkhoone_api::services::auth::{AuthService, NewAccount};
    use ashpazkhoone_core::UserRole;
    use ashpazkhoone_core::models::settings::CURRENT_SCHEMA_VERSION;

    use super::*;

    async fn seed_admin(path: &Path) {
        AuthService::new(&JsonFileDb::new(path))
            .register(NewAccount {
                name: "Admin",
                email: "admin@example.com",
                password: "correct horse battery",
                phone: None,
                role: UserRole::Admin,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_init_creates_sample_categories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("db.json");

        init(&path, false).await.unwrap();

        let db = JsonFileDb::new(&path).read().await.unwrap();
        assert_eq!(db.categories.len(), SAMPLE_CATEGORIES.len());
        assert_eq!(db.categories[0].slug, "cookware");
        assert_eq!(db.settings.schema_version, CURRENT_SCHEMA_VERSION);
        assert!(db.products.is_empty());
    }

    #[tokio::test]
    async fn test_init_refuses_existing_file_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        seed_admin(&path).await;

        let err = init(&path, false).await.unwrap_err();
        assert!(matches!(err, CliError::AlreadyInitialized(_)));

        init(&path, true).await.unwrap();
        let db = JsonFileDb::new(&path).read().await.unwrap();
        assert!(db.users.is_empty());
        assert!(dir.path().join("db.json.pre-restore").exists());
    }

    #[tokio::test]
    async fn test_backup_then_restore() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        init(&path, false).await.unwrap();
        seed_admin(&path).await;
        let before = JsonFileDb::new(&path).read().await.unwrap();

        let out = dir.path().join("backup.json");
        assert_eq!(backup(&path, Some(&out)).await.unwrap(), out);

        JsonFileDb::new(&path)
            .mutate(|db| {
                db.categories.clear();
                Ok::<_, RepositoryError>(())
            })
            .await
            .unwrap();

        restore(&path, &out).await.unwrap();
        assert_eq!(JsonFileDb::new(&path).read().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_restore_rejects_backup_without_admin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let input = dir.path().join("backup.json");
        tokio::fs::write(&input, br#"{"products": [], "users": []}"#)
            .await
            .unwrap();

        let err = restore(&path, &input).await.unwrap_err();
        assert!(matches!(err, CliError::NoAdmin));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_restore_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("backup.json");
        tokio::fs::write(&input, b"not json").await.unwrap();

        let err = restore(&dir.path().join("db.json"), &input)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Json { .. }));
    }

    #[tokio::test]
    async fn test_migrate_settings_rewrites_legacy_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let legacy = json!({
            "products": [],
            "settings": { "siteName": "آشپزخونه", "phone": "02112345678", "shippingCost": 50000 }
        });
        tokio::fs::write(&path, legacy.to_string()).await.unwrap();

        assert!(migrate_settings(&path).await.unwrap());

        let raw: Value = serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(raw["settings"]["schemaVersion"], json!(CURRENT_SCHEMA_VERSION));
        assert_eq!(raw["settings"]["general"]["siteName"], json!("آشپزخونه"));

        assert!(!migrate_settings(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_migrate_settings_without_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        assert!(!migrate_settings(&path).await.unwrap());
        assert!(!path.exists());
    }
}
