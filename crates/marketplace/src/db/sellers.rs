//! Seller applications and seller profiles.

use sqlx::PgPool;

use livestall_core::public_id::PublicIdKind;
use livestall_core::validation::SellerApplicationInput;
use livestall_core::{SellerApplicationId, SellerApplicationStatus, UserId};

use super::{RepositoryError, conflict_on_unique, counters};
use crate::models::{SellerApplication, SellerProfile};

const APPLICATION_SELECT: &str = "\
    SELECT a.id, a.user_id, u.email AS applicant_email, u.display_name AS applicant_name, \
           a.store_name, a.phone, a.description, a.payout_account, a.status, \
           a.rejection_reason, a.reviewed_at, a.created_at \
    FROM marketplace.seller_application a \
    JOIN marketplace.user u ON u.id = a.user_id";

const PROFILE_COLUMNS: &str = "user_id, public_id, store_name, phone, description, \
                               payout_account, welcome_seen, created_at";

pub struct SellerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SellerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Submit an application to sell.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already has a pending
    /// application.
    pub async fn submit_application(
        &self,
        user_id: UserId,
        input: &SellerApplicationInput,
    ) -> Result<SellerApplicationId, RepositoryError> {
        sqlx::query_scalar::<_, SellerApplicationId>(
            "INSERT INTO marketplace.seller_application \
                 (user_id, store_name, phone, description, payout_account) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(user_id)
        .bind(&input.store_name)
        .bind(&input.phone)
        .bind(&input.description)
        .bind(&input.payout_account)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "you already have an application under review"))
    }

    /// The user's most recent application.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_application(
        &self,
        user_id: UserId,
    ) -> Result<Option<SellerApplication>, RepositoryError> {
        let application = sqlx::query_as::<_, SellerApplication>(&format!(
            "{APPLICATION_SELECT} WHERE a.user_id = $1 ORDER BY a.created_at DESC, a.id DESC LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(application)
    }

    /// Applications, oldest pending first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_applications(
        &self,
        status: Option<SellerApplicationStatus>,
    ) -> Result<Vec<SellerApplication>, RepositoryError> {
        let applications = sqlx::query_as::<_, SellerApplication>(&format!(
            "{APPLICATION_SELECT} \
             WHERE $1::marketplace.seller_application_status IS NULL OR a.status = $1 \
             ORDER BY a.created_at ASC, a.id ASC"
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;
        Ok(applications)
    }

    /// Approve a pending application.
    ///
    /// Creates (or refreshes) the seller profile with a `SEL-` public ID and
    /// promotes the applicant to seller. Admins keep their role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no pending application
    /// with that ID.
    pub async fn approve(
        &self,
        id: SellerApplicationId,
        reviewer: UserId,
    ) -> Result<SellerProfile, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let application = sqlx::query_as::<_, (UserId, String, String, String, String)>(
            "UPDATE marketplace.seller_application \
             SET status = 'approved', reviewed_by = $2, reviewed_at = now() \
             WHERE id = $1 AND status = 'pending' \
             RETURNING user_id, store_name, phone, description, payout_account",
        )
        .bind(id)
        .bind(reviewer)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        let (user_id, store_name, phone, description, payout_account) = application;

        let public_id = counters::next_public_id(&mut *tx, PublicIdKind::Seller).await?;

        let profile = sqlx::query_as::<_, SellerProfile>(&format!(
            "INSERT INTO marketplace.seller_profile \
                 (user_id, public_id, store_name, phone, description, payout_account) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (user_id) DO UPDATE SET store_name = $3, phone = $4, \
                 description = $5, payout_account = $6 \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&public_id)
        .bind(&store_name)
        .bind(&phone)
        .bind(&description)
        .bind(&payout_account)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE marketplace.user \
             SET role = CASE WHEN role = 'admin' THEN role ELSE 'seller' END, updated_at = now() \
             WHERE id = $1",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(profile)
    }

    /// Reject a pending application. Returns the applicant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no pending application
    /// with that ID.
    pub async fn reject(
        &self,
        id: SellerApplicationId,
        reviewer: UserId,
        reason: &str,
    ) -> Result<UserId, RepositoryError> {
        sqlx::query_scalar::<_, UserId>(
            "UPDATE marketplace.seller_application \
             SET status = 'rejected', rejection_reason = $3, reviewed_by = $2, reviewed_at = now() \
             WHERE id = $1 AND status = 'pending' RETURNING user_id",
        )
        .bind(id)
        .bind(reviewer)
        .bind(reason)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// A seller's store profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn profile(&self, user_id: UserId) -> Result<Option<SellerProfile>, RepositoryError> {
        let profile = sqlx::query_as::<_, SellerProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM marketplace.seller_profile WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(profile)
    }

    /// Remember that the seller dismissed the welcome dialog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no seller profile.
    pub async fn mark_welcome_seen(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE marketplace.seller_profile SET welcome_seen = TRUE WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Count pending applications.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_pending(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM marketplace.seller_application WHERE status = 'pending'",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }
}
