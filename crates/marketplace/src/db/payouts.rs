//! Seller payout repository.

use rust_decimal::Decimal;
use sqlx::PgPool;

use livestall_core::public_id::PublicIdKind;
use livestall_core::{PayoutId, PayoutStatus, UserId};

use super::{RepositoryError, counters};
use crate::models::Payout;
use crate::models::seller::available_balance;

const PAYOUT_SELECT: &str = "\
    SELECT p.id, p.public_id, p.seller_id, COALESCE(sp.store_name, u.display_name) AS store_name, \
           p.amount, p.status, p.note, p.requested_at, p.processed_at \
    FROM marketplace.payout p \
    JOIN marketplace.user u ON u.id = p.seller_id \
    LEFT JOIN marketplace.seller_profile sp ON sp.user_id = p.seller_id";

/// Delivered sales and payouts still counting against them.
const BALANCE_QUERY: &str = "\
    SELECT \
        (SELECT COALESCE(SUM(total), 0) FROM marketplace.\"order\" \
          WHERE seller_id = $1 AND stage = 'delivered') AS delivered_total, \
        (SELECT COALESCE(SUM(amount), 0) FROM marketplace.payout \
          WHERE seller_id = $1 AND status <> 'rejected') AS reserved";

pub struct PayoutRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PayoutRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Balance a seller may still request, after `commission_percent`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn available_balance(
        &self,
        seller_id: UserId,
        commission_percent: Decimal,
    ) -> Result<Decimal, RepositoryError> {
        let (delivered, reserved) = sqlx::query_as::<_, (Decimal, Decimal)>(BALANCE_QUERY)
            .bind(seller_id)
            .fetch_one(self.pool)
            .await?;
        Ok(available_balance(delivered, commission_percent, reserved))
    }

    /// Request a payout.
    ///
    /// The balance check and the insert run in one transaction holding a lock
    /// on the seller's profile, so two requests cannot overdraw it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if `amount` exceeds the available
    /// balance, `RepositoryError::NotFound` if the user has no seller profile.
    pub async fn request(
        &self,
        seller_id: UserId,
        amount: Decimal,
        commission_percent: Decimal,
    ) -> Result<Payout, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT 1 FROM marketplace.seller_profile WHERE user_id = $1 FOR UPDATE")
            .bind(seller_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let (delivered, reserved) = sqlx::query_as::<_, (Decimal, Decimal)>(BALANCE_QUERY)
            .bind(seller_id)
            .fetch_one(&mut *tx)
            .await?;
        let available = available_balance(delivered, commission_percent, reserved);
        if amount > available {
            return Err(RepositoryError::Conflict(format!(
                "amount exceeds your available balance of ${available:.2}"
            )));
        }

        let public_id = counters::next_public_id(&mut *tx, PublicIdKind::Payout).await?;
        let id = sqlx::query_scalar::<_, PayoutId>(
            "INSERT INTO marketplace.payout (public_id, seller_id, amount) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&public_id)
        .bind(seller_id)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        let payout = sqlx::query_as::<_, Payout>(&format!("{PAYOUT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(payout)
    }

    /// A seller's payouts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_seller(&self, seller_id: UserId) -> Result<Vec<Payout>, RepositoryError> {
        let payouts = sqlx::query_as::<_, Payout>(&format!(
            "{PAYOUT_SELECT} WHERE p.seller_id = $1 ORDER BY p.requested_at DESC, p.id DESC"
        ))
        .bind(seller_id)
        .fetch_all(self.pool)
        .await?;
        Ok(payouts)
    }

    /// All payouts, oldest first, optionally one status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self, status: Option<PayoutStatus>) -> Result<Vec<Payout>, RepositoryError> {
        let payouts = sqlx::query_as::<_, Payout>(&format!(
            "{PAYOUT_SELECT} WHERE $1::marketplace.payout_status IS NULL OR p.status = $1 \
             ORDER BY p.requested_at ASC, p.id ASC"
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;
        Ok(payouts)
    }

    /// Move a payout to `next`, if the transition is allowed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown payout and
    /// `RepositoryError::Conflict` for a transition that is not allowed.
    pub async fn transition(
        &self,
        id: PayoutId,
        next: PayoutStatus,
        note: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, PayoutStatus>(
            "SELECT status FROM marketplace.payout WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if !current.can_transition_to(next) {
            return Err(RepositoryError::Conflict(format!(
                "cannot move a {current} payout to {next}"
            )));
        }

        sqlx::query(
            "UPDATE marketplace.payout \
             SET status = $2, note = COALESCE($3, note), processed_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(next)
        .bind(note)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Sum of payouts for a seller still waiting to be paid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn pending_total(&self, seller_id: UserId) -> Result<Decimal, RepositoryError> {
        let total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM marketplace.payout \
             WHERE seller_id = $1 AND status IN ('requested', 'approved')",
        )
        .bind(seller_id)
        .fetch_one(self.pool)
        .await?;
        Ok(total)
    }

    /// Count payouts awaiting review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_requested(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM marketplace.payout WHERE status = 'requested'",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }
}
