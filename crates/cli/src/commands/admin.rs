//! Admin account commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a new admin account
//! LIVESTALL_ADMIN_PASSWORD=... livestall-cli admin create -e admin@example.com -n "Admin Name"
//!
//! # Promote an existing account
//! livestall-cli admin promote -e someone@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `LIVESTALL_DATABASE_URL` - `PostgreSQL` connection string
//! - `LIVESTALL_ADMIN_PASSWORD` - Password for `admin create` when `--password` is omitted

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use livestall_core::{Email, UserId, UserRole};
use livestall_web::db::{RepositoryError, UserRepository};
use livestall_web::services::auth::{AuthError, AuthService};

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// User already exists.
    #[error("An account already exists with email: {0}. Use 'admin promote' instead.")]
    UserExists(String),

    /// No account with that email.
    #[error("No account with email: {0}")]
    UserNotFound(String),

    /// Name or password rejected.
    #[error("{0}")]
    Invalid(String),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<AuthError> for AdminError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidEmail(e) => Self::InvalidEmail(e.to_string()),
            AuthError::Repository(e) => Self::Repository(e),
            other => Self::Invalid(other.to_string()),
        }
    }
}

/// Create a new admin account.
///
/// # Returns
///
/// The ID of the created account.
///
/// # Errors
///
/// Returns an error if the email is taken, the name or password fails
/// validation, or the database is unreachable.
pub async fn create_user(email: &str, name: &str, password: &SecretString) -> Result<UserId, AdminError> {
    let pool = connect().await?;

    tracing::info!("Creating admin account: {email}");

    let password = password.expose_secret();
    let user = AuthService::new(&pool)
        .create_account(email, name, password, password, UserRole::Admin)
        .await
        .map_err(|e| match e {
            AuthError::UserAlreadyExists => AdminError::UserExists(email.to_owned()),
            other => other.into(),
        })?;

    tracing::info!(
        "Admin account created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );

    Ok(user.id)
}

/// Give an existing account the admin role.
///
/// # Errors
///
/// Returns an error if no account has this email or the database is
/// unreachable.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let parsed =
        Email::parse_normalized(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    let user = users
        .get_by_email(&parsed)
        .await?
        .ok_or_else(|| AdminError::UserNotFound(email.to_owned()))?;

    if user.role == UserRole::Admin {
        tracing::info!("{} is already an admin", user.email);
        return Ok(());
    }

    users.set_role(user.id, UserRole::Admin).await?;
    tracing::info!("{} ({}) is now an admin", user.display_name, user.email);
    Ok(())
}
