//! Authentication service.
//!
//! Password accounts stored in the data file, hashed with Argon2id.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use secrecy::ExposeSecret;

use ashpazkhoone_core::models::{User, next_id};
use ashpazkhoone_core::{Email, Phone, UserRole};

use crate::config::BootstrapAdmin;
use crate::db::{JsonFileDb, RepositoryError};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Details for a new account.
#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub phone: Option<&'a str>,
    pub role: UserRole,
}

/// Authentication service.
///
/// Handles user registration, login and admin bootstrap.
pub struct AuthService<'a> {
    db: &'a JsonFileDb,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(db: &'a JsonFileDb) -> Self {
        Self { db }
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `InvalidPhone`, `MissingName` or
    /// `WeakPassword` for bad input, and `AuthError::UserAlreadyExists` if the
    /// email is taken.
    pub async fn register(&self, account: NewAccount<'_>) -> Result<User, AuthError> {
        let email = Email::parse(account.email)?;
        let phone = account
            .phone
            .filter(|p| !p.trim().is_empty())
            .map(Phone::parse)
            .transpose()?;
        let name = account.name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }
        validate_password(account.password)?;
        let password_hash = hash_password(account.password)?;

        let user = self
            .db
            .mutate(|db| {
                if db.users.iter().any(|u| u.email == email) {
                    return Err(AuthError::UserAlreadyExists);
                }
                let user = User {
                    id: next_id(&db.users),
                    name: name.to_string(),
                    email,
                    phone,
                    role: account.role,
                    password_hash,
                    addresses: Vec::new(),
                    created_at: Utc::now(),
                };
                Ok(db.insert(user)?)
            })
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "account created");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let db = self.db.read().await?;
        let user = db
            .users
            .into_iter()
            .find(|u| u.email == email)
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &user.password_hash)?;
        Ok(user)
    }

    /// Create the configured admin unless an admin already exists.
    ///
    /// Returns the created user, or `None` when nothing was done.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the account cannot be created.
    pub async fn ensure_admin(&self, admin: &BootstrapAdmin) -> Result<Option<User>, AuthError> {
        let db = self.db.read().await?;
        if db.users.iter().any(User::is_admin) {
            return Ok(None);
        }
        let user = self
            .register(NewAccount {
                name: "Admin",
                email: admin.email.as_str(),
                password: admin.password.expose_secret(),
                phone: None,
                role: UserRole::Admin,
            })
            .await?;
        Ok(Some(user))
    }

    /// Replace a user's password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` for a short password or
    /// `AuthError::Repository` if the user does not exist.
    pub async fn set_password(&self, email: &Email, password: &str) -> Result<User, AuthError> {
        validate_password(password)?;
        let password_hash = hash_password(password)?;
        self.db
            .mutate(|db| {
                let user = db
                    .users
                    .iter_mut()
                    .find(|u| &u.email == email)
                    .ok_or(RepositoryError::NotFound)?;
                user.password_hash = password_hash;
                Ok(user.clone())
            })
            .await
    }
}

// =============================================================================
// Password Helpers
// =============================================================================

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
