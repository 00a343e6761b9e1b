//! One-time passcode storage.
//!
//! Only code hashes are stored. Issuing a code replaces any unconsumed code
//! for the same email and purpose; a code is burned after
//! [`MAX_FAILED_ATTEMPTS`] wrong guesses.

use chrono::Utc;
use sqlx::PgPool;

use livestall_core::otp::{MAX_FAILED_ATTEMPTS, OtpPurpose, code_ttl, hash_code};

use super::RepositoryError;

/// Outcome of checking a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    /// Code matched and is now consumed.
    Valid,
    /// Wrong code; this many attempts remain.
    Invalid { remaining: i32 },
    /// No live code for this email (never sent, expired, used, or burned).
    Expired,
}

pub struct OtpRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OtpRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a freshly generated code, replacing earlier live ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn issue(
        &self,
        email: &str,
        purpose: OtpPurpose,
        code: &str,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM marketplace.otp_code \
             WHERE email = $1 AND purpose = $2 AND consumed_at IS NULL",
        )
        .bind(email)
        .bind(purpose.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO marketplace.otp_code (email, purpose, code_hash, expires_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(email)
        .bind(purpose.as_str())
        .bind(hash_code(code))
        .bind(Utc::now() + code_ttl())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Check a normalized code and consume it on a match.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn verify(
        &self,
        email: &str,
        purpose: OtpPurpose,
        code: &str,
    ) -> Result<OtpCheck, RepositoryError> {
        let consumed = sqlx::query_scalar::<_, i32>(
            "UPDATE marketplace.otp_code SET consumed_at = now() \
             WHERE id = ( \
                 SELECT id FROM marketplace.otp_code \
                 WHERE email = $1 AND purpose = $2 AND code_hash = $3 \
                   AND consumed_at IS NULL AND expires_at > now() AND attempts < $4 \
                 ORDER BY created_at DESC LIMIT 1) \
             RETURNING id",
        )
        .bind(email)
        .bind(purpose.as_str())
        .bind(hash_code(code))
        .bind(MAX_FAILED_ATTEMPTS)
        .fetch_optional(self.pool)
        .await?;

        if consumed.is_some() {
            return Ok(OtpCheck::Valid);
        }

        let attempts = sqlx::query_scalar::<_, i32>(
            "UPDATE marketplace.otp_code SET attempts = attempts + 1 \
             WHERE id = ( \
                 SELECT id FROM marketplace.otp_code \
                 WHERE email = $1 AND purpose = $2 \
                   AND consumed_at IS NULL AND expires_at > now() AND attempts < $3 \
                 ORDER BY created_at DESC LIMIT 1) \
             RETURNING attempts",
        )
        .bind(email)
        .bind(purpose.as_str())
        .bind(MAX_FAILED_ATTEMPTS)
        .fetch_optional(self.pool)
        .await?;

        Ok(match attempts {
            Some(attempts) if attempts < MAX_FAILED_ATTEMPTS => OtpCheck::Invalid {
                remaining: MAX_FAILED_ATTEMPTS - attempts,
            },
            Some(_) | None => OtpCheck::Expired,
        })
    }

    /// Delete codes that expired more than a day ago.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM marketplace.otp_code WHERE expires_at < now() - INTERVAL '1 day'",
        )
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
