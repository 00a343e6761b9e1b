//! Buyer-seller conversation repository.

use sqlx::PgPool;

use livestall_core::{ConversationId, ProductId, UserId};

use super::RepositoryError;
use crate::models::{ConversationSummary, Message};

pub struct ConversationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ConversationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find the conversation between a buyer and a seller about a product
    /// (or about nothing in particular), creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` when buyer and seller are the same
    /// user.
    pub async fn find_or_create(
        &self,
        buyer_id: UserId,
        seller_id: UserId,
        product_id: Option<ProductId>,
    ) -> Result<ConversationId, RepositoryError> {
        if buyer_id == seller_id {
            return Err(RepositoryError::Conflict(
                "you cannot message your own store".to_owned(),
            ));
        }

        // The no-op update makes RETURNING yield the existing row too.
        let id = sqlx::query_scalar::<_, ConversationId>(
            "INSERT INTO marketplace.conversation (buyer_id, seller_id, product_id) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (buyer_id, seller_id, (COALESCE(product_id, 0))) \
             DO UPDATE SET buyer_id = EXCLUDED.buyer_id \
             RETURNING id",
        )
        .bind(buyer_id)
        .bind(seller_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }

    /// Conversations `user_id` takes part in, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn inbox(&self, user_id: UserId) -> Result<Vec<ConversationSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, ConversationSummary>(
            "SELECT c.id, c.buyer_id, c.seller_id, c.product_id, p.title AS product_title, \
                    CASE WHEN c.buyer_id = $1 \
                         THEN COALESCE(sp.store_name, su.display_name) \
                         ELSE bu.display_name END AS counterpart_name, \
                    (SELECT m.body FROM marketplace.message m WHERE m.conversation_id = c.id \
                      ORDER BY m.created_at DESC, m.id DESC LIMIT 1) AS last_message, \
                    c.last_message_at, \
                    (SELECT COUNT(*) FROM marketplace.message m \
                      WHERE m.conversation_id = c.id AND m.sender_id <> $1 \
                        AND m.read_at IS NULL) AS unread_count \
             FROM marketplace.conversation c \
             JOIN marketplace.user bu ON bu.id = c.buyer_id \
             JOIN marketplace.user su ON su.id = c.seller_id \
             LEFT JOIN marketplace.seller_profile sp ON sp.user_id = c.seller_id \
             LEFT JOIN marketplace.product p ON p.id = c.product_id \
             WHERE c.buyer_id = $1 OR c.seller_id = $1 \
             ORDER BY c.last_message_at DESC, c.id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// One conversation as seen by `user_id`, if they take part in it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the conversation does not exist
    /// or `user_id` is not a participant.
    pub async fn get_for_participant(
        &self,
        id: ConversationId,
        user_id: UserId,
    ) -> Result<ConversationSummary, RepositoryError> {
        self.inbox(user_id)
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or(RepositoryError::NotFound)
    }

    /// Messages in a conversation, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn messages(&self, id: ConversationId) -> Result<Vec<Message>, RepositoryError> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT m.id, m.conversation_id, m.sender_id, u.display_name AS sender_name, \
                    m.body, m.read_at, m.created_at \
             FROM marketplace.message m \
             JOIN marketplace.user u ON u.id = m.sender_id \
             WHERE m.conversation_id = $1 \
             ORDER BY m.created_at ASC, m.id ASC",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(messages)
    }

    /// Append a message and bump the conversation's activity time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if `sender_id` is not a participant.
    pub async fn send(
        &self,
        id: ConversationId,
        sender_id: UserId,
        body: &str,
    ) -> Result<Message, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query(
            "UPDATE marketplace.conversation SET last_message_at = now() \
             WHERE id = $1 AND (buyer_id = $2 OR seller_id = $2)",
        )
        .bind(id)
        .bind(sender_id)
        .execute(&mut *tx)
        .await?;
        if touched.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let message = sqlx::query_as::<_, Message>(
            "WITH inserted AS ( \
                INSERT INTO marketplace.message (conversation_id, sender_id, body) \
                VALUES ($1, $2, $3) \
                RETURNING id, conversation_id, sender_id, body, read_at, created_at) \
             SELECT i.id, i.conversation_id, i.sender_id, u.display_name AS sender_name, \
                    i.body, i.read_at, i.created_at \
             FROM inserted i JOIN marketplace.user u ON u.id = i.sender_id",
        )
        .bind(id)
        .bind(sender_id)
        .bind(body)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(message)
    }

    /// Mark the other participant's messages as read by `reader_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_read(
        &self,
        id: ConversationId,
        reader_id: UserId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE marketplace.message SET read_at = now() \
             WHERE conversation_id = $1 AND sender_id <> $2 AND read_at IS NULL",
        )
        .bind(id)
        .bind(reader_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
