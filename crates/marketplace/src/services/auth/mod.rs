//! Authentication service.
//!
//! Email and password accounts with Argon2id hashes. One-time passcode
//! sign-in lives in [`crate::services::otp`].

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use livestall_core::validation::{validate_display_name, validate_password};
use livestall_core::{Email, UserId, UserRole};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid,
    /// `AuthError::Invalid` if the name or password is rejected, and
    /// `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<User, AuthError> {
        self.create_account(email, display_name, password, password_confirm, UserRole::Customer)
            .await
    }

    /// Create an account with an explicit role. Used by the CLI for admins.
    ///
    /// # Errors
    ///
    /// Same as [`AuthService::register`].
    pub async fn create_account(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
        password_confirm: &str,
        role: UserRole,
    ) -> Result<User, AuthError> {
        let email = Email::parse_normalized(email)?;
        let display_name = validate_display_name(display_name)?;
        validate_password(password, password_confirm)?;

        let password_hash = hash_password(password)?;

        self.users
            .create_with_password(&email, &display_name, role, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong
    /// and `AuthError::Suspended` for suspended accounts.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse_normalized(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_with_password(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if user.is_suspended() {
            return Err(AuthError::Suspended);
        }

        Ok(user)
    }

    /// Replace a user's password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Invalid` if the new password is rejected.
    pub async fn change_password(
        &self,
        user_id: UserId,
        password: &str,
        password_confirm: &str,
    ) -> Result<(), AuthError> {
        validate_password(password, password_confirm)?;
        let password_hash = hash_password(password)?;
        self.users.set_password(user_id, &password_hash).await?;
        Ok(())
    }
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
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::PasswordHash)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::PasswordHash)
        ));
    }
}
