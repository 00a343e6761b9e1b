//! Product Q&A repository.

use sqlx::PgPool;

use livestall_core::{ProductId, QuestionId, UserId};

use super::RepositoryError;
use crate::models::ProductQuestion;

const QUESTION_SELECT: &str = "\
    SELECT q.id, q.product_id, p.title AS product_title, q.asker_id, \
           u.display_name AS asker_name, q.question, q.answer, q.answered_at, q.created_at \
    FROM marketplace.product_question q \
    JOIN marketplace.product p ON p.id = q.product_id \
    JOIN marketplace.user u ON u.id = q.asker_id";

pub struct QuestionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> QuestionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Questions on a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(&self, product_id: ProductId) -> Result<Vec<ProductQuestion>, RepositoryError> {
        let questions = sqlx::query_as::<_, ProductQuestion>(&format!(
            "{QUESTION_SELECT} WHERE q.product_id = $1 ORDER BY q.created_at DESC"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(questions)
    }

    /// Questions on a seller's products, unanswered first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_seller(&self, seller_id: UserId) -> Result<Vec<ProductQuestion>, RepositoryError> {
        let questions = sqlx::query_as::<_, ProductQuestion>(&format!(
            "{QUESTION_SELECT} WHERE p.seller_id = $1 \
             ORDER BY (q.answer IS NOT NULL), q.created_at DESC"
        ))
        .bind(seller_id)
        .fetch_all(self.pool)
        .await?;
        Ok(questions)
    }

    /// Most recent questions across the site, for moderation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<ProductQuestion>, RepositoryError> {
        let questions = sqlx::query_as::<_, ProductQuestion>(&format!(
            "{QUESTION_SELECT} ORDER BY q.created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(questions)
    }

    /// Ask a question.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn ask(
        &self,
        product_id: ProductId,
        asker_id: UserId,
        question: &str,
    ) -> Result<QuestionId, RepositoryError> {
        let id = sqlx::query_scalar::<_, QuestionId>(
            "INSERT INTO marketplace.product_question (product_id, asker_id, question) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(product_id)
        .bind(asker_id)
        .bind(question)
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }

    /// Answer a question on one of the seller's products.
    ///
    /// Returns the product the question belongs to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the question does not exist or
    /// is on another seller's product.
    pub async fn answer(
        &self,
        id: QuestionId,
        seller_id: UserId,
        answer: &str,
    ) -> Result<ProductId, RepositoryError> {
        sqlx::query_scalar::<_, ProductId>(
            "UPDATE marketplace.product_question q SET answer = $3, answered_at = now() \
             FROM marketplace.product p \
             WHERE q.id = $1 AND p.id = q.product_id AND p.seller_id = $2 \
             RETURNING q.product_id",
        )
        .bind(id)
        .bind(seller_id)
        .bind(answer)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a question (moderation). Returns its product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the question does not exist.
    pub async fn delete(&self, id: QuestionId) -> Result<ProductId, RepositoryError> {
        sqlx::query_scalar::<_, ProductId>(
            "DELETE FROM marketplace.product_question WHERE id = $1 RETURNING product_id",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
