//! Order repository, including the checkout transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use livestall_core::checkout::SellerOrderDraft;
use livestall_core::public_id::PublicIdKind;
use livestall_core::timeline::OrderTimeline;
use livestall_core::{CouponId, OrderId, OrderStage, UserId};

use super::{RepositoryError, counters};
use crate::models::{Order, OrderItem, ShippingAddress};

const ORDER_SELECT: &str = "\
    SELECT o.id, o.public_id, o.buyer_id, b.display_name AS buyer_name, \
           o.seller_id, COALESCE(sp.store_name, s.display_name) AS seller_name, \
           o.subtotal, o.discount, o.shipping, o.total, o.coupon_code, \
           o.shipping_name, o.shipping_address, o.shipping_city, o.shipping_postal_code, \
           o.shipping_country, o.phone, o.stage, o.timeline, o.tracking_number, o.created_at \
    FROM marketplace.\"order\" o \
    JOIN marketplace.user b ON b.id = o.buyer_id \
    JOIN marketplace.user s ON s.id = o.seller_id \
    LEFT JOIN marketplace.seller_profile sp ON sp.user_id = o.seller_id";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    public_id: String,
    buyer_id: UserId,
    buyer_name: String,
    seller_id: UserId,
    seller_name: String,
    subtotal: Decimal,
    discount: Decimal,
    shipping: Decimal,
    total: Decimal,
    coupon_code: Option<String>,
    shipping_name: String,
    shipping_address: String,
    shipping_city: String,
    shipping_postal_code: String,
    shipping_country: String,
    phone: String,
    stage: OrderStage,
    timeline: Json<OrderTimeline>,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(r: OrderRow) -> Self {
        Self {
            id: r.id,
            public_id: r.public_id,
            buyer_id: r.buyer_id,
            buyer_name: r.buyer_name,
            seller_id: r.seller_id,
            seller_name: r.seller_name,
            subtotal: r.subtotal,
            discount: r.discount,
            shipping: r.shipping,
            total: r.total,
            coupon_code: r.coupon_code,
            shipping_address: ShippingAddress {
                name: r.shipping_name,
                address: r.shipping_address,
                city: r.shipping_city,
                postal_code: r.shipping_postal_code,
                country: r.shipping_country,
                phone: r.phone,
            },
            stage: r.stage,
            timeline: r.timeline.0,
            tracking_number: r.tracking_number,
            created_at: r.created_at,
        }
    }
}

/// Everything needed to write the orders of one checkout.
#[derive(Debug)]
pub struct NewOrders<'a> {
    pub buyer_id: UserId,
    pub drafts: &'a [SellerOrderDraft],
    pub address: &'a ShippingAddress,
    /// Coupon applied to this checkout, with its normalized code.
    pub coupon: Option<(CouponId, &'a str)>,
    pub placed_at: DateTime<Utc>,
}

/// An order written by [`OrderRepository::place`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub public_id: String,
    pub seller_id: UserId,
}

/// Money figures for one seller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct SellerSales {
    pub open_orders: i64,
    /// Totals of all non-cancelled orders.
    pub gross_sales: Decimal,
    /// Totals of delivered orders.
    pub delivered_total: Decimal,
}

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Write all orders of a checkout in one transaction.
    ///
    /// Decrements stock for every line and counts one use of the coupon. If
    /// any product lacks stock, or the coupon ran out in the meantime,
    /// nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` naming the product that is out of
    /// stock, or when the coupon can no longer be used.
    pub async fn place(&self, new: &NewOrders<'_>) -> Result<Vec<PlacedOrder>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut placed = Vec::with_capacity(new.drafts.len());
        let timeline = Json(OrderTimeline::standard(new.placed_at));

        for draft in new.drafts {
            let lines = draft
                .lines
                .iter()
                .map(|line| {
                    i32::try_from(line.quantity)
                        .map(|quantity| (line, quantity))
                        .map_err(|_| {
                            RepositoryError::Conflict(format!(
                                "invalid quantity for {}",
                                line.title
                            ))
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            for &(line, quantity) in &lines {
                let updated = sqlx::query(
                    "UPDATE marketplace.product SET stock = stock - $2, updated_at = now() \
                     WHERE id = $1 AND status = 'active' AND stock >= $2",
                )
                .bind(line.product_id)
                .bind(quantity)
                .execute(&mut *tx)
                .await?;

                if updated.rows_affected() == 0 {
                    return Err(RepositoryError::Conflict(format!(
                        "{} is out of stock",
                        line.title
                    )));
                }
            }

            let public_id = counters::next_public_id(&mut *tx, PublicIdKind::Order).await?;

            let id = sqlx::query_scalar::<_, OrderId>(
                "INSERT INTO marketplace.\"order\" \
                     (public_id, buyer_id, seller_id, subtotal, discount, shipping, total, \
                      coupon_code, shipping_name, shipping_address, shipping_city, \
                      shipping_postal_code, shipping_country, phone, stage, timeline, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, \
                         'placed', $15, $16) \
                 RETURNING id",
            )
            .bind(&public_id)
            .bind(new.buyer_id)
            .bind(draft.seller_id)
            .bind(draft.subtotal)
            .bind(draft.discount)
            .bind(draft.shipping)
            .bind(draft.total)
            .bind(
                new.coupon
                    .filter(|_| draft.discount > Decimal::ZERO)
                    .map(|(_, code)| code),
            )
            .bind(&new.address.name)
            .bind(&new.address.address)
            .bind(&new.address.city)
            .bind(&new.address.postal_code)
            .bind(&new.address.country)
            .bind(&new.address.phone)
            .bind(&timeline)
            .bind(new.placed_at)
            .fetch_one(&mut *tx)
            .await?;

            for &(line, quantity) in &lines {
                sqlx::query(
                    "INSERT INTO marketplace.order_item \
                         (order_id, product_id, title, unit_price, quantity, line_total) \
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(id)
                .bind(line.product_id)
                .bind(&line.title)
                .bind(line.unit_price)
                .bind(quantity)
                .bind(line.line_total())
                .execute(&mut *tx)
                .await?;
            }

            placed.push(PlacedOrder {
                id,
                public_id,
                seller_id: draft.seller_id,
            });
        }

        if let Some((coupon_id, _)) = new.coupon {
            let used = sqlx::query(
                "UPDATE marketplace.coupon SET used_count = used_count + 1 \
                 WHERE id = $1 AND active \
                   AND (usage_limit IS NULL OR used_count < usage_limit)",
            )
            .bind(coupon_id)
            .execute(&mut *tx)
            .await?;

            if used.rows_affected() == 0 {
                return Err(RepositoryError::Conflict(
                    "this coupon has reached its usage limit".to_owned(),
                ));
            }
        }

        tx.commit().await?;
        Ok(placed)
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Order::from))
    }

    /// Items of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, product_id, title, unit_price, quantity, line_total \
             FROM marketplace.order_item WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// A buyer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE o.buyer_id = $1 ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(buyer_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// A seller's orders, newest first, optionally only one stage.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_seller(
        &self,
        seller_id: UserId,
        stage: Option<OrderStage>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE o.seller_id = $1 \
               AND ($2::marketplace.order_stage IS NULL OR o.stage = $2) \
             ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(seller_id)
        .bind(stage)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(
        &self,
        stage: Option<OrderStage>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE ($1::marketplace.order_stage IS NULL OR o.stage = $1) \
             ORDER BY o.created_at DESC, o.id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(stage)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Save a new timeline.
    ///
    /// Only applies if the order is still at `expected`, so two concurrent
    /// updates cannot both win.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order moved in the meantime.
    pub async fn update_timeline(
        &self,
        id: OrderId,
        expected: OrderStage,
        timeline: &OrderTimeline,
        tracking_number: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let stage = timeline.current_stage().unwrap_or(OrderStage::Placed);
        let result = sqlx::query(
            "UPDATE marketplace.\"order\" \
             SET timeline = $3, stage = $4, \
                 tracking_number = COALESCE($5, tracking_number), updated_at = now() \
             WHERE id = $1 AND stage = $2",
        )
        .bind(id)
        .bind(expected)
        .bind(Json(timeline))
        .bind(stage)
        .bind(tracking_number)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(
                "order was updated by someone else".to_owned(),
            ));
        }
        Ok(())
    }

    /// Cancel an order and put its items back in stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order moved in the meantime.
    pub async fn cancel(
        &self,
        id: OrderId,
        expected: OrderStage,
        timeline: &OrderTimeline,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE marketplace.\"order\" \
             SET timeline = $3, stage = 'cancelled', updated_at = now() \
             WHERE id = $1 AND stage = $2",
        )
        .bind(id)
        .bind(expected)
        .bind(Json(timeline))
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(
                "order was updated by someone else".to_owned(),
            ));
        }

        sqlx::query(
            "UPDATE marketplace.product p SET stock = p.stock + i.quantity, updated_at = now() \
             FROM marketplace.order_item i \
             WHERE i.order_id = $1 AND p.id = i.product_id",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Open order count and sales totals for a seller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn seller_sales(&self, seller_id: UserId) -> Result<SellerSales, RepositoryError> {
        let sales = sqlx::query_as::<_, SellerSales>(
            "SELECT \
                 COUNT(*) FILTER (WHERE stage NOT IN ('delivered', 'cancelled')) AS open_orders, \
                 COALESCE(SUM(total) FILTER (WHERE stage <> 'cancelled'), 0) AS gross_sales, \
                 COALESCE(SUM(total) FILTER (WHERE stage = 'delivered'), 0) AS delivered_total \
             FROM marketplace.\"order\" WHERE seller_id = $1",
        )
        .bind(seller_id)
        .fetch_one(self.pool)
        .await?;
        Ok(sales)
    }

    /// Count all orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM marketplace.\"order\"")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
