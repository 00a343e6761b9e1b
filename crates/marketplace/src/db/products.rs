//! Product and product image repository.

use sqlx::PgPool;

use livestall_core::validation::ProductFields;
use livestall_core::{ProductId, ProductImageId, ProductStatus, UserId};

use super::RepositoryError;
use super::users::escape_like;
use crate::models::catalog::PAGE_SIZE;
use crate::models::{Product, ProductImage, ProductQuery};

/// Product columns joined with the seller's store name and first image.
const PRODUCT_SELECT: &str = "\
    SELECT p.id, p.seller_id, COALESCE(sp.store_name, u.display_name) AS seller_name, \
           p.title, p.description, p.price, p.stock, p.category, p.status, \
           (SELECT i.url FROM marketplace.product_image i \
             WHERE i.product_id = p.id ORDER BY i.position, i.id LIMIT 1) AS image_url, \
           p.created_at, p.updated_at \
    FROM marketplace.product p \
    JOIN marketplace.user u ON u.id = p.seller_id \
    LEFT JOIN marketplace.seller_profile sp ON sp.user_id = p.seller_id";

/// One page of catalog results.
#[derive(Debug, Clone, Default)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: i64,
}

impl ProductPage {
    #[must_use]
    pub fn page_count(&self) -> i64 {
        ((self.total + PAGE_SIZE - 1) / PAGE_SIZE).max(1)
    }
}

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Search active products.
    ///
    /// Matches `q` case-insensitively against title and description.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError> {
        let pattern = query.search_text().map(|q| format!("%{}%", escape_like(q)));
        let category = query.category_filter();
        let filter = "WHERE p.status = 'active' \
                      AND ($1::text IS NULL OR p.title ILIKE $1 OR p.description ILIKE $1) \
                      AND ($2::text IS NULL OR lower(p.category) = lower($2))";

        let products = sqlx::query_as::<_, Product>(&format!(
            "{PRODUCT_SELECT} {filter} ORDER BY {} LIMIT $3 OFFSET $4",
            query.sort.order_by()
        ))
        .bind(pattern.as_deref())
        .bind(category)
        .bind(PAGE_SIZE)
        .bind(query.offset())
        .fetch_all(self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM marketplace.product p {filter}"
        ))
        .bind(pattern.as_deref())
        .bind(category)
        .fetch_one(self.pool)
        .await?;

        Ok(ProductPage { products, total })
    }

    /// Newest active products for the home page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn newest(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{PRODUCT_SELECT} WHERE p.status = 'active' ORDER BY p.created_at DESC, p.id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Get a product in any status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(product)
    }

    /// Get several products by ID, in any status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let products = sqlx::query_as::<_, Product>(&format!(
            "{PRODUCT_SELECT} WHERE p.id = ANY($1) ORDER BY p.title"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// All of a seller's products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_seller(&self, seller_id: UserId) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{PRODUCT_SELECT} WHERE p.seller_id = $1 ORDER BY p.created_at DESC, p.id DESC"
        ))
        .bind(seller_id)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Products for moderation, optionally filtered by status and text.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(
        &self,
        status: Option<ProductStatus>,
        search: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let pattern = search.map(|q| format!("%{}%", escape_like(q)));
        let products = sqlx::query_as::<_, Product>(&format!(
            "{PRODUCT_SELECT} \
             WHERE ($1::marketplace.product_status IS NULL OR p.status = $1) \
               AND ($2::text IS NULL OR p.title ILIKE $2) \
             ORDER BY p.created_at DESC, p.id DESC LIMIT $3"
        ))
        .bind(status)
        .bind(pattern)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Distinct categories of active products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM marketplace.product \
             WHERE status = 'active' ORDER BY category",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// Create a product for a seller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        seller_id: UserId,
        fields: &ProductFields,
        status: ProductStatus,
    ) -> Result<ProductId, RepositoryError> {
        let id = sqlx::query_scalar::<_, ProductId>(
            "INSERT INTO marketplace.product \
                 (seller_id, title, description, price, stock, category, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(seller_id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(fields.stock)
        .bind(&fields.category)
        .bind(status)
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }

    /// Update a seller's own product.
    ///
    /// A product hidden by moderation keeps its `hidden` status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist or
    /// belongs to another seller.
    pub async fn update(
        &self,
        id: ProductId,
        seller_id: UserId,
        fields: &ProductFields,
        status: ProductStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE marketplace.product \
             SET title = $3, description = $4, price = $5, stock = $6, category = $7, \
                 status = CASE WHEN status = 'hidden' THEN status ELSE $8 END, \
                 updated_at = now() \
             WHERE id = $1 AND seller_id = $2",
        )
        .bind(id)
        .bind(seller_id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(fields.stock)
        .bind(&fields.category)
        .bind(status)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Set a product's status (moderation).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn set_status(&self, id: ProductId, status: ProductStatus) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE marketplace.product SET status = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Count products, optionally for one seller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, seller_id: Option<UserId>) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM marketplace.product WHERE $1::int IS NULL OR seller_id = $1",
        )
        .bind(seller_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// Images of a product, in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images(&self, product_id: ProductId) -> Result<Vec<ProductImage>, RepositoryError> {
        let images = sqlx::query_as::<_, ProductImage>(
            "SELECT id, product_id, url, position FROM marketplace.product_image \
             WHERE product_id = $1 ORDER BY position, id",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(images)
    }

    /// Append an image to a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn add_image(&self, product_id: ProductId, url: &str) -> Result<ProductImage, RepositoryError> {
        let image = sqlx::query_as::<_, ProductImage>(
            "INSERT INTO marketplace.product_image (product_id, url, position) \
             VALUES ($1, $2, \
                     (SELECT COALESCE(MAX(position) + 1, 0) FROM marketplace.product_image \
                       WHERE product_id = $1)) \
             RETURNING id, product_id, url, position",
        )
        .bind(product_id)
        .bind(url)
        .fetch_one(self.pool)
        .await?;
        Ok(image)
    }

    /// Remove an image, returning its URL so the file can be deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image is not on that product.
    pub async fn delete_image(
        &self,
        product_id: ProductId,
        image_id: ProductImageId,
    ) -> Result<String, RepositoryError> {
        sqlx::query_scalar::<_, String>(
            "DELETE FROM marketplace.product_image WHERE id = $1 AND product_id = $2 RETURNING url",
        )
        .bind(image_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        let page = |total| ProductPage {
            products: Vec::new(),
            total,
        };
        assert_eq!(page(0).page_count(), 1);
        assert_eq!(page(24).page_count(), 1);
        assert_eq!(page(25).page_count(), 2);
    }
}
