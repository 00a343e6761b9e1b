//! One-time passcode sign-in and email verification.

use sqlx::PgPool;
use thiserror::Error;

use livestall_core::otp::{OtpPurpose, generate_code, normalize_code};
use livestall_core::{Email, EmailError as AddressError};

use crate::db::otp::{OtpCheck, OtpRepository};
use crate::db::{RepositoryError, UserRepository};
use crate::models::User;
use crate::services::email::{EmailError, EmailService};

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] AddressError),

    #[error("enter the 6-digit code from your email")]
    MalformedCode,

    #[error("that code is not right, {remaining} attempts left")]
    WrongCode { remaining: i32 },

    #[error("that code has expired, request a new one")]
    Expired,

    /// Code was valid but no account uses this email.
    #[error("no account uses this email")]
    UnknownAccount,

    #[error("account suspended")]
    Suspended,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("email error: {0}")]
    Email(#[from] EmailError),
}

pub struct OtpService<'a> {
    codes: OtpRepository<'a>,
    users: UserRepository<'a>,
    email: &'a EmailService,
}

impl<'a> OtpService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: &'a EmailService) -> Self {
        Self {
            codes: OtpRepository::new(pool),
            users: UserRepository::new(pool),
            email,
        }
    }

    /// Issue a code and email it.
    ///
    /// Sign-in codes are only sent to existing accounts, but the caller gets
    /// the same `Ok` either way so the endpoint does not reveal which emails
    /// are registered.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::InvalidEmail` for a malformed address, or a
    /// repository or email error.
    pub async fn send_code(&self, email: &str, purpose: OtpPurpose) -> Result<Email, OtpError> {
        let email = Email::parse_normalized(email)?;

        if purpose == OtpPurpose::SignIn && self.users.get_by_email(&email).await?.is_none() {
            tracing::info!(
                email = %email.masked(),
                purpose = purpose.as_str(),
                "OTP requested for unknown email"
            );
            return Ok(email);
        }

        let code = generate_code();
        self.codes.issue(email.as_str(), purpose, &code).await?;
        self.email.send_otp_code(email.as_str(), &code).await?;

        tracing::info!(email = %email.masked(), purpose = purpose.as_str(), "OTP issued");
        Ok(email)
    }

    /// Check a code. Consumes it on success.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::MalformedCode`, `OtpError::WrongCode`, or
    /// `OtpError::Expired` when the code does not check out.
    pub async fn verify(&self, email: &str, purpose: OtpPurpose, code: &str) -> Result<Email, OtpError> {
        let email = Email::parse_normalized(email)?;
        let code = normalize_code(code).ok_or(OtpError::MalformedCode)?;

        match self.codes.verify(email.as_str(), purpose, &code).await? {
            OtpCheck::Valid => Ok(email),
            OtpCheck::Invalid { remaining } => Err(OtpError::WrongCode { remaining }),
            OtpCheck::Expired => Err(OtpError::Expired),
        }
    }

    /// Verify a sign-in code and return the account it unlocks.
    ///
    /// Signing in with a code also proves ownership of the address.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`OtpService::verify`], plus
    /// `OtpError::UnknownAccount` and `OtpError::Suspended`.
    pub async fn sign_in(&self, email: &str, code: &str) -> Result<User, OtpError> {
        let email = self.verify(email, OtpPurpose::SignIn, code).await?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(OtpError::UnknownAccount)?;

        if user.is_suspended() {
            return Err(OtpError::Suspended);
        }

        if !user.email_verified {
            self.users.mark_email_verified(user.id).await?;
        }

        Ok(user)
    }
}
