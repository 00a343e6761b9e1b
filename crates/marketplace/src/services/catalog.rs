//! Product detail cache.
//!
//! Product pages are cached with `moka` for five minutes. Writes that change
//! what a product page shows (edits, images, moderation, answers) call
//! [`CatalogCache::invalidate`].

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use livestall_core::ProductId;

use crate::db::{ProductRepository, QuestionRepository, RepositoryError};
use crate::models::{Product, ProductImage, ProductQuestion};

/// Everything the product page renders.
#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub product: Product,
    pub images: Vec<ProductImage>,
    pub questions: Vec<ProductQuestion>,
}

#[derive(Clone)]
pub struct CatalogCache {
    products: Cache<ProductId, Arc<ProductDetail>>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    #[must_use]
    pub fn new() -> Self {
        let products = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self { products }
    }

    /// Load a product page, from cache when possible.
    ///
    /// Returns `None` when the product does not exist. Visibility rules are
    /// the caller's concern; hidden products are cached like any other.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the product cannot be loaded.
    pub async fn product(
        &self,
        pool: &PgPool,
        id: ProductId,
    ) -> Result<Option<Arc<ProductDetail>>, RepositoryError> {
        if let Some(detail) = self.products.get(&id).await {
            debug!(product_id = %id, "Cache hit for product");
            return Ok(Some(detail));
        }

        let products = ProductRepository::new(pool);
        let Some(product) = products.get(id).await? else {
            return Ok(None);
        };
        let images = products.images(id).await?;
        let questions = QuestionRepository::new(pool).list_for_product(id).await?;

        let detail = Arc::new(ProductDetail {
            product,
            images,
            questions,
        });
        self.products.insert(id, Arc::clone(&detail)).await;
        Ok(Some(detail))
    }

    /// Drop a product from the cache.
    pub async fn invalidate(&self, id: ProductId) {
        self.products.invalidate(&id).await;
    }

    #[cfg(test)]
    async fn contains(&self, id: ProductId) -> bool {
        self.products.get(&id).await.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use livestall_core::{ProductStatus, UserId};

    use super::*;

    fn detail(id: i32) -> ProductDetail {
        ProductDetail {
            product: Product {
                id: ProductId::new(id),
                seller_id: UserId::new(1),
                seller_name: "Stall".to_owned(),
                title: "Mug".to_owned(),
                description: String::new(),
                price: Decimal::TEN,
                stock: 3,
                category: "Home".to_owned(),
                status: ProductStatus::Active,
                image_url: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            images: Vec::new(),
            questions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let cache = CatalogCache::new();
        let id = ProductId::new(7);
        cache.products.insert(id, Arc::new(detail(7))).await;
        assert!(cache.contains(id).await);

        cache.invalidate(id).await;
        assert!(!cache.contains(id).await);
    }
}
