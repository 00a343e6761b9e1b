//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] livestall_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No account for this email.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Account was suspended by an admin.
    #[error("account suspended")]
    Suspended,

    /// Password, confirmation, or display name rejected.
    #[error("{0}")]
    Invalid(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl From<livestall_core::validation::ValidationErrors> for AuthError {
    fn from(errors: livestall_core::validation::ValidationErrors) -> Self {
        Self::Invalid(errors.to_string())
    }
}
