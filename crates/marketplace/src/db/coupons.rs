//! Coupon repository.
//!
//! Every write is scoped to an owner: `None` for platform coupons managed by
//! admins, `Some(seller)` for a seller's own coupons.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use livestall_core::coupon::Coupon;
use livestall_core::validation::CouponFields;
use livestall_core::{CouponId, CouponKind, UserId};

use super::{RepositoryError, conflict_on_unique};

const COUPON_COLUMNS: &str = "id, code, kind, value, min_order_value, max_discount, seller_id, \
                              starts_at, expires_at, usage_limit, used_count, active";

#[derive(sqlx::FromRow)]
struct CouponRow {
    id: CouponId,
    code: String,
    kind: CouponKind,
    value: Decimal,
    min_order_value: Option<Decimal>,
    max_discount: Option<Decimal>,
    seller_id: Option<UserId>,
    starts_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    usage_limit: Option<i32>,
    used_count: i32,
    active: bool,
}

impl From<CouponRow> for Coupon {
    fn from(r: CouponRow) -> Self {
        Self {
            id: r.id,
            code: r.code,
            kind: r.kind,
            value: r.value,
            min_order_value: r.min_order_value,
            max_discount: r.max_discount,
            seller_id: r.seller_id,
            starts_at: r.starts_at,
            expires_at: r.expires_at,
            usage_limit: r.usage_limit,
            used_count: r.used_count,
            active: r.active,
        }
    }
}

pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up a coupon by its normalized code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM marketplace.coupon WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Coupon::from))
    }

    /// Coupons owned by `owner`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, owner: Option<UserId>) -> Result<Vec<Coupon>, RepositoryError> {
        let rows = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM marketplace.coupon \
             WHERE seller_id IS NOT DISTINCT FROM $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Coupon::from).collect())
    }

    /// Create a coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is already taken.
    pub async fn create(
        &self,
        owner: Option<UserId>,
        fields: &CouponFields,
    ) -> Result<CouponId, RepositoryError> {
        sqlx::query_scalar::<_, CouponId>(
            "INSERT INTO marketplace.coupon \
                 (code, kind, value, min_order_value, max_discount, seller_id, \
                  starts_at, expires_at, usage_limit) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
        )
        .bind(&fields.code)
        .bind(fields.kind)
        .bind(fields.value)
        .bind(fields.min_order_value)
        .bind(fields.max_discount)
        .bind(owner)
        .bind(fields.starts_at)
        .bind(fields.expires_at)
        .bind(fields.usage_limit)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "a coupon with this code already exists"))
    }

    /// Enable or disable a coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if `owner` does not own the coupon.
    pub async fn set_active(
        &self,
        id: CouponId,
        owner: Option<UserId>,
        active: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE marketplace.coupon SET active = $3 \
             WHERE id = $1 AND seller_id IS NOT DISTINCT FROM $2",
        )
        .bind(id)
        .bind(owner)
        .bind(active)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if `owner` does not own the coupon.
    pub async fn delete(&self, id: CouponId, owner: Option<UserId>) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM marketplace.coupon WHERE id = $1 AND seller_id IS NOT DISTINCT FROM $2",
        )
        .bind(id)
        .bind(owner)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
