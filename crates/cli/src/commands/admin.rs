//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! ak-cli admin create -e admin@example.com -n "Admin Name" -p "a long password"
//! ak-cli admin password -e admin@example.com -p "a new long password"
//! ```
//!
//! The password may also come from `AK_ADMIN_PASSWORD`.

use std::path::Path;

use ashpazkhoone_api::db::JsonFileDb;
use ashpazkhoone_api::services::auth::{AuthError, AuthService, NewAccount};
use ashpazkhoone_core::{Email, UserRole};
use ashpazkhoone_core::models::User;
use secrecy::{ExposeSecret, SecretString};

use crate::error::CliError;

/// Create a new admin user.
///
/// # Errors
///
/// Returns [`CliError::Auth`] for an invalid email, a short password or an
/// email that is already registered.
pub async fn create_user(
    data_file: &Path,
    email: &str,
    name: &str,
    password: SecretString,
) -> Result<User, CliError> {
    let db = JsonFileDb::new(data_file);

    tracing::info!("Creating admin user: {email}");
    let user = AuthService::new(&db)
        .register(NewAccount {
            name,
            email,
            password: password.expose_secret(),
            phone: None,
            role: UserRole::Admin,
        })
        .await?;

    tracing::info!(user_id = %user.id, path = %data_file.display(), "admin user created");
    Ok(user)
}

/// Replace the password of an existing account.
///
/// Works for any role, so a locked-out admin can be recovered from the shell.
///
/// # Errors
///
/// Returns [`CliError::Auth`] for an invalid email, a short password or an
/// unknown account.
pub async fn set_password(
    data_file: &Path,
    email: &str,
    password: SecretString,
) -> Result<User, CliError> {
    let email = Email::parse(email).map_err(AuthError::from)?;
    let db = JsonFileDb::new(data_file);

    let user = AuthService::new(&db)
        .set_password(&email, password.expose_secret())
        .await?;

    tracing::info!(user_id = %user.id, "password changed");
    Ok(user)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ashpazkhoone_api::db::RepositoryError;

    use super::*;

    #[tokio::test]
    async fn test_create_user_adds_admin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");

        let user = create_user(
            &path,
            "Owner@Example.com",
            "Owner",
            SecretString::from("a long enough password"),
        )
        .await
        .unwrap();

        assert!(user.is_admin());
        let db = JsonFileDb::new(&path).read().await.unwrap();
        assert_eq!(db.users.len(), 1);
        assert_eq!(db.users[0].email.as_str(), "owner@example.com");
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_email() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let password = || SecretString::from("a long enough password");

        create_user(&path, "owner@example.com", "Owner", password())
            .await
            .unwrap();
        let err = create_user(&path, "owner@example.com", "Other", password())
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::Auth(AuthError::UserAlreadyExists)));
    }

    #[tokio::test]
    async fn test_create_user_rejects_short_password() {
        let dir = tempfile::tempdir().unwrap();
        let err = create_user(
            &dir.path().join("db.json"),
            "owner@example.com",
            "Owner",
            SecretString::from("short"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CliError::Auth(AuthError::WeakPassword(_))));
    }

    #[tokio::test]
    async fn test_set_password_replaces_login() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        create_user(
            &path,
            "owner@example.com",
            "Owner",
            SecretString::from("a long enough password"),
        )
        .await
        .unwrap();

        set_password(
            &path,
            "Owner@example.com",
            SecretString::from("a different password"),
        )
        .await
        .unwrap();

        let db = JsonFileDb::new(&path);
        let auth = AuthService::new(&db);
        assert!(
            auth.login("owner@example.com", "a long enough password")
                .await
                .is_err()
        );
        let user = auth
            .login("owner@example.com", "a different password")
            .await
            .unwrap();
        assert!(user.is_admin());
    }

    #[tokio::test]
    async fn test_set_password_for_unknown_account_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = set_password(
            &dir.path().join("db.json"),
            "nobody@example.com",
            SecretString::from("a different password"),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            CliError::Auth(AuthError::Repository(RepositoryError::NotFound))
        ));
    }
}
