//! Live selling sessions.
//!
//! Streams are a UI surface only: a seller schedules one, marks it live, and
//! ends it. Buyers see live and upcoming streams with their featured products.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use livestall_core::{LiveStreamId, LiveStreamStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::LiveStream;

const STREAM_SELECT: &str = "\
    SELECT s.id, s.seller_id, COALESCE(sp.store_name, u.display_name) AS store_name, \
           s.title, s.description, s.scheduled_at, s.status, s.started_at, s.ended_at \
    FROM marketplace.live_stream s \
    JOIN marketplace.user u ON u.id = s.seller_id \
    LEFT JOIN marketplace.seller_profile sp ON sp.user_id = s.seller_id";

/// Fields for a new stream.
#[derive(Debug, Clone)]
pub struct NewLiveStream<'a> {
    pub seller_id: UserId,
    pub title: &'a str,
    pub description: &'a str,
    pub scheduled_at: DateTime<Utc>,
    pub product_ids: &'a [ProductId],
}

pub struct LiveStreamRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LiveStreamRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Schedule a stream. Only the seller's own products are attached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an insert fails.
    pub async fn create(&self, stream: &NewLiveStream<'_>) -> Result<LiveStreamId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, LiveStreamId>(
            "INSERT INTO marketplace.live_stream (seller_id, title, description, scheduled_at) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(stream.seller_id)
        .bind(stream.title)
        .bind(stream.description)
        .bind(stream.scheduled_at)
        .fetch_one(&mut *tx)
        .await?;

        let product_ids: Vec<i32> = stream.product_ids.iter().map(ProductId::as_i32).collect();
        sqlx::query(
            "INSERT INTO marketplace.live_stream_product (live_stream_id, product_id) \
             SELECT $1, p.id FROM marketplace.product p \
             WHERE p.id = ANY($2) AND p.seller_id = $3 \
             ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(&product_ids)
        .bind(stream.seller_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// A stream with its featured product IDs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the stream does not exist.
    pub async fn get(&self, id: LiveStreamId) -> Result<LiveStream, RepositoryError> {
        let mut stream = sqlx::query_as::<_, LiveStream>(&format!("{STREAM_SELECT} WHERE s.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        stream.product_ids = self.product_ids(id).await?;
        Ok(stream)
    }

    async fn product_ids(&self, id: LiveStreamId) -> Result<Vec<ProductId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, ProductId>(
            "SELECT product_id FROM marketplace.live_stream_product \
             WHERE live_stream_id = $1 ORDER BY product_id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(ids)
    }

    /// A seller's streams, newest schedule first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_seller(&self, seller_id: UserId) -> Result<Vec<LiveStream>, RepositoryError> {
        let streams = sqlx::query_as::<_, LiveStream>(&format!(
            "{STREAM_SELECT} WHERE s.seller_id = $1 ORDER BY s.scheduled_at DESC"
        ))
        .bind(seller_id)
        .fetch_all(self.pool)
        .await?;
        Ok(streams)
    }

    /// Streams that are live now or scheduled, live ones first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_public(&self, limit: i64) -> Result<Vec<LiveStream>, RepositoryError> {
        let mut streams = sqlx::query_as::<_, LiveStream>(&format!(
            "{STREAM_SELECT} WHERE s.status <> 'ended' \
             ORDER BY (s.status = 'live') DESC, s.scheduled_at ASC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        for stream in &mut streams {
            stream.product_ids = self.product_ids(stream.id).await?;
        }
        Ok(streams)
    }

    /// Move a seller's stream to `status`.
    ///
    /// Going live stamps `started_at`; ending stamps `ended_at`. Ended
    /// streams cannot be restarted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the stream is not the seller's
    /// or has already ended.
    pub async fn set_status(
        &self,
        id: LiveStreamId,
        seller_id: UserId,
        status: LiveStreamStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE marketplace.live_stream SET status = $3, \
                 started_at = CASE WHEN $3 = 'live'::marketplace.live_stream_status \
                                   THEN COALESCE(started_at, now()) ELSE started_at END, \
                 ended_at = CASE WHEN $3 = 'ended'::marketplace.live_stream_status \
                                 THEN now() ELSE ended_at END \
             WHERE id = $1 AND seller_id = $2 AND status <> 'ended'",
        )
        .bind(id)
        .bind(seller_id)
        .bind(status)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
