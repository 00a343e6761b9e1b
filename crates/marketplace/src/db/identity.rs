//! Identity verification sessions.

use sqlx::PgPool;
use uuid::Uuid;

use livestall_core::{IdentityStatus, UserId};

use super::RepositoryError;
use crate::models::IdentitySession;

const SESSION_COLUMNS: &str =
    "id, user_id, reference, status, hosted_url, created_at, completed_at";

pub struct IdentityRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> IdentityRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a new pending session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        reference: Uuid,
        hosted_url: &str,
    ) -> Result<IdentitySession, RepositoryError> {
        let session = sqlx::query_as::<_, IdentitySession>(&format!(
            "INSERT INTO marketplace.identity_session (user_id, reference, hosted_url) \
             VALUES ($1, $2, $3) RETURNING {SESSION_COLUMNS}"
        ))
        .bind(user_id)
        .bind(reference)
        .bind(hosted_url)
        .fetch_one(self.pool)
        .await?;
        Ok(session)
    }

    /// Look a session up by its provider reference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown reference.
    pub async fn get_by_reference(&self, reference: Uuid) -> Result<IdentitySession, RepositoryError> {
        sqlx::query_as::<_, IdentitySession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM marketplace.identity_session WHERE reference = $1"
        ))
        .bind(reference)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// The user's most recent session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<IdentitySession>, RepositoryError> {
        let session = sqlx::query_as::<_, IdentitySession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM marketplace.identity_session \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(session)
    }

    /// Settle a pending session. A verified result also flags the user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no pending session with
    /// this reference.
    pub async fn complete(
        &self,
        reference: Uuid,
        status: IdentityStatus,
    ) -> Result<IdentitySession, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let session = sqlx::query_as::<_, IdentitySession>(&format!(
            "UPDATE marketplace.identity_session SET status = $2, completed_at = now() \
             WHERE reference = $1 AND status = 'pending' RETURNING {SESSION_COLUMNS}"
        ))
        .bind(reference)
        .bind(status)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if status == IdentityStatus::Verified {
            sqlx::query(
                "UPDATE marketplace.user SET identity_verified = TRUE, updated_at = now() \
                 WHERE id = $1",
            )
            .bind(session.user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(session)
    }
}
