//! Checkout: reprice the session cart, validate the coupon, split per seller,
//! and write the orders.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use livestall_core::cart::Cart;
use livestall_core::checkout::{CartTotals, SellerOrderDraft, ShippingPolicy, split_by_seller, summarize};
use livestall_core::coupon::{Coupon, CouponError};
use livestall_core::{Price, ProductId};

use crate::db::orders::{NewOrders, PlacedOrder};
use crate::db::{CouponRepository, OrderRepository, ProductRepository, RepositoryError};
use crate::models::{CurrentUser, ShippingAddress};
use crate::services::email::{EmailService, OrderSummaryLine};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("your cart is empty")]
    EmptyCart,

    #[error("please fill in: {}", .0.join(", "))]
    MissingAddress(Vec<&'static str>),

    #[error("{0}")]
    Coupon(#[from] CouponError),

    /// A product ran out or changed while the buyer was checking out.
    #[error("{0}")]
    Unavailable(String),

    /// Prices, stock, or listings moved since the buyer saw the summary.
    #[error("your cart changed: {}. Please review and place the order again", .0.join("; "))]
    CartChanged(Vec<String>),

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CheckoutError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(message) => Self::Unavailable(message),
            other => Self::Repository(other),
        }
    }
}

/// The cart as it would be ordered right now.
#[derive(Debug, Clone)]
pub struct CheckoutSummary {
    /// Cart with current titles, prices, and quantities capped by stock.
    pub cart: Cart,
    pub drafts: Vec<SellerOrderDraft>,
    pub totals: CartTotals,
    pub coupon: Option<Coupon>,
    /// Why the applied coupon does not count, if it doesn't.
    pub coupon_error: Option<String>,
    /// Changes made while repricing, shown to the buyer.
    pub notices: Vec<String>,
}

/// Orders written by a successful checkout.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub orders: Vec<PlacedOrder>,
    pub drafts: Vec<SellerOrderDraft>,
}

impl Receipt {
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        summarize(&self.drafts)
    }
}

pub struct CheckoutService<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Refresh cart lines from the catalog.
    ///
    /// Unlisted or sold-out products are dropped, quantities are capped at
    /// the remaining stock, and prices and titles are replaced by the
    /// current ones. Returns the refreshed cart and a notice per change.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the products cannot be loaded.
    pub async fn reprice(&self, cart: &Cart) -> Result<(Cart, Vec<String>), RepositoryError> {
        let ids: Vec<ProductId> = cart.lines.iter().map(|l| l.product_id).collect();
        let products: HashMap<ProductId, _> = ProductRepository::new(self.pool)
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut fresh = Cart {
            lines: Vec::with_capacity(cart.lines.len()),
            coupon_code: cart.coupon_code.clone(),
        };
        let mut notices = Vec::new();

        for line in &cart.lines {
            let Some(product) = products.get(&line.product_id).filter(|p| p.is_listed()) else {
                notices.push(format!("{} is no longer available and was removed", line.title));
                continue;
            };
            let stock = u32::try_from(product.stock).unwrap_or(0);
            if stock == 0 {
                notices.push(format!("{} is sold out and was removed", product.title));
                continue;
            }

            let mut line = line.clone();
            if line.quantity > stock {
                notices.push(format!("Only {stock} of {} left; quantity reduced", product.title));
                line.quantity = stock;
            }
            if line.unit_price != product.price {
                notices.push(format!(
                    "The price of {} changed to {}",
                    product.title,
                    Price::usd(product.price).display()
                ));
                line.unit_price = product.price;
            }
            line.title.clone_from(&product.title);
            line.seller_name.clone_from(&product.seller_name);
            line.image_url.clone_from(&product.image_url);
            fresh.lines.push(line);
        }

        Ok((fresh, notices))
    }

    /// Look up the cart's coupon and compute its discount.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Coupon` if the code is unknown or cannot be
    /// used with this cart.
    pub async fn resolve_coupon(
        &self,
        cart: &Cart,
        now: DateTime<Utc>,
    ) -> Result<Option<(Coupon, Decimal)>, CheckoutError> {
        let Some(code) = cart.coupon_code.as_deref() else {
            return Ok(None);
        };
        let coupon = CouponRepository::new(self.pool)
            .get_by_code(code)
            .await?
            .ok_or(CouponError::NotFound)?;
        let discount = coupon.apply_to(cart, now)?;
        Ok(Some((coupon, discount)))
    }

    /// Price the cart for display. Coupon problems are reported, not raised.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if a query fails.
    pub async fn summarize(
        &self,
        cart: &Cart,
        policy: &ShippingPolicy,
    ) -> Result<CheckoutSummary, CheckoutError> {
        let (cart, notices) = self.reprice(cart).await?;

        let (coupon, coupon_error) = match self.resolve_coupon(&cart, Utc::now()).await {
            Ok(found) => (found, None),
            Err(CheckoutError::Coupon(e)) => (None, Some(e.to_string())),
            Err(e) => return Err(e),
        };

        let drafts = split_by_seller(&cart, coupon.as_ref().map(|(c, d)| (c, *d)), policy);
        let totals = summarize(&drafts);

        Ok(CheckoutSummary {
            cart,
            drafts,
            totals,
            coupon: coupon.map(|(c, _)| c),
            coupon_error,
            notices,
        })
    }

    /// Place the orders for a cart.
    ///
    /// Prices and stock are re-read first. Any difference from the cart the
    /// buyer confirmed aborts the checkout, and the coupon must still be
    /// valid. All seller orders are written in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` if the cart is empty or changed, the address
    /// incomplete, the coupon unusable, or a product out of stock.
    pub async fn place(
        &self,
        buyer: &CurrentUser,
        cart: &Cart,
        address: &ShippingAddress,
        policy: &ShippingPolicy,
    ) -> Result<Receipt, CheckoutError> {
        let missing = address.missing_fields();
        if !missing.is_empty() {
            return Err(CheckoutError::MissingAddress(missing));
        }

        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let (cart, notices) = self.reprice(cart).await?;
        if !notices.is_empty() {
            return Err(CheckoutError::CartChanged(notices));
        }

        let now = Utc::now();
        let coupon = self.resolve_coupon(&cart, now).await?;
        let drafts = split_by_seller(&cart, coupon.as_ref().map(|(c, d)| (c, *d)), policy);

        let orders = OrderRepository::new(self.pool)
            .place(&NewOrders {
                buyer_id: buyer.id,
                drafts: &drafts,
                address,
                coupon: coupon.as_ref().map(|(c, _)| (c.id, c.code.as_str())),
                placed_at: now,
            })
            .await?;

        tracing::info!(
            buyer_id = %buyer.id,
            orders = orders.len(),
            total = %summarize(&drafts).total,
            "Checkout completed"
        );

        Ok(Receipt { orders, drafts })
    }

    /// Email the buyer a confirmation. Failures are logged and swallowed.
    pub async fn send_confirmation(
        email: &EmailService,
        buyer: &CurrentUser,
        receipt: &Receipt,
        orders_url: &str,
    ) {
        let lines: Vec<OrderSummaryLine> = receipt
            .orders
            .iter()
            .filter_map(|p| {
                receipt
                    .drafts
                    .iter()
                    .find(|d| d.seller_id == p.seller_id)
                    .map(|d| OrderSummaryLine {
                        public_id: p.public_id.clone(),
                        seller_name: d.seller_name.clone(),
                        total: Price::usd(d.total).display(),
                    })
            })
            .collect();
        let grand_total = Price::usd(receipt.totals().total).display();

        if let Err(e) = email
            .send_order_placed(
                buyer.email.as_str(),
                &buyer.display_name,
                &lines,
                &grand_total,
                orders_url,
            )
            .await
        {
            tracing::warn!(error = %e, "Order confirmation email failed");
        }
    }
}
