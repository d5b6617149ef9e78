//! Authentication error types.

use axum::http::StatusCode;
use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] ashpazkhoone_core::EmailError),

    /// Invalid phone number.
    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] ashpazkhoone_core::PhoneError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Name missing.
    #[error("name is required")]
    MissingName,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    pub(crate) fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::PasswordHash
                | Self::Repository(RepositoryError::Io(_) | RepositoryError::DataCorruption(_))
        )
    }

    pub(crate) fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::UserAlreadyExists | Self::Repository(RepositoryError::Conflict(_)) => {
                StatusCode::CONFLICT
            }
            Self::InvalidEmail(_)
            | Self::InvalidPhone(_)
            | Self::WeakPassword(_)
            | Self::MissingName
            | Self::Repository(RepositoryError::Invalid(_)) => StatusCode::BAD_REQUEST,
            Self::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            Self::PasswordHash | Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn client_message(&self) -> String {
        match self {
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::UserAlreadyExists => "An account with this email already exists".to_string(),
            Self::WeakPassword(msg) => msg.clone(),
            Self::InvalidEmail(_) => "Invalid email address".to_string(),
            Self::InvalidPhone(err) => err.to_string(),
            Self::MissingName => self.to_string(),
            _ => "Authentication error".to_string(),
        }
    }
}
