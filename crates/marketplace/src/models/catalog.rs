//! Catalog models: products, images, questions, and search parameters.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use livestall_core::{Price, ProductId, ProductImageId, ProductStatus, QuestionId, UserId};

/// Products per catalog page.
pub const PAGE_SIZE: i64 = 24;

/// A product listing, joined with its seller's store name and first image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub seller_id: UserId,
    pub seller_name: String,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub category: String,
    pub status: ProductStatus,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub const fn display_price(&self) -> Price {
        Price::usd(self.price)
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Whether a buyer can see and order it.
    #[must_use]
    pub const fn is_listed(&self) -> bool {
        self.status.is_purchasable()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product_id: ProductId,
    pub url: String,
    pub position: i32,
}

/// A buyer question on a product page, with the seller's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ProductQuestion {
    pub id: QuestionId,
    pub product_id: ProductId,
    pub product_title: String,
    pub asker_id: UserId,
    pub asker_name: String,
    pub question: String,
    pub answer: Option<String>,
    pub answered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Catalog sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

impl ProductSort {
    /// `ORDER BY` clause for the product listing query.
    #[must_use]
    pub const fn order_by(&self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::PriceAsc => "p.price ASC, p.id ASC",
            Self::PriceDesc => "p.price DESC, p.id DESC",
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
        }
    }
}

/// Catalog search parameters from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
    #[serde(default)]
    pub page: Option<u32>,
}

impl ProductQuery {
    /// Search text, trimmed; `None` when blank.
    #[must_use]
    pub fn search_text(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn category_filter(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// 1-based page number.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * PAGE_SIZE
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let query = ProductQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.offset(), 0);
        assert_eq!(query.sort, ProductSort::Newest);
        assert!(query.search_text().is_none());
    }

    #[test]
    fn test_query_offset() {
        let query = ProductQuery {
            page: Some(3),
            ..ProductQuery::default()
        };
        assert_eq!(query.offset(), 48);
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let query = ProductQuery {
            page: Some(0),
            ..ProductQuery::default()
        };
        assert_eq!(query.page(), 1);
    }

    #[test]
    fn test_blank_search_is_none() {
        let query = ProductQuery {
            q: Some("   ".to_owned()),
            category: Some(" Kitchen ".to_owned()),
            ..ProductQuery::default()
        };
        assert!(query.search_text().is_none());
        assert_eq!(query.category_filter(), Some("Kitchen"));
    }

    #[test]
    fn test_sort_deserializes_snake_case() {
        let sort: ProductSort = serde_json::from_str("\"price_desc\"").unwrap();
        assert_eq!(sort, ProductSort::PriceDesc);
    }
}
