//! Coupon eligibility and discount calculation.
//!
//! A coupon is either platform-wide (created by an admin, applies to the whole
//! cart) or scoped to one seller (applies only to that seller's lines).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::Cart;
use crate::types::{CouponId, CouponKind, UserId, round_money};

/// Minimum length of a coupon code.
pub const MIN_CODE_LENGTH: usize = 3;

/// Maximum length of a coupon code.
pub const MAX_CODE_LENGTH: usize = 32;

/// Reasons a coupon cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    #[error("coupon code is not valid")]
    InvalidCode,
    #[error("coupon not found")]
    NotFound,
    #[error("this coupon is no longer active")]
    Inactive,
    #[error("this coupon is not valid yet")]
    NotStarted,
    #[error("this coupon has expired")]
    Expired,
    #[error("this coupon has reached its usage limit")]
    Exhausted,
    #[error("spend at least ${minimum} to use this coupon")]
    BelowMinimum { minimum: Decimal },
    #[error("this coupon does not apply to any item in your cart")]
    NotApplicable,
}

/// A discount code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    /// Normalized (uppercase) code.
    pub code: String,
    pub kind: CouponKind,
    /// Percentage (0-100] for `Percentage`, amount for `Fixed`.
    pub value: Decimal,
    /// Eligible subtotal required before the coupon applies.
    pub min_order_value: Option<Decimal>,
    /// Cap on the discount of a percentage coupon.
    pub max_discount: Option<Decimal>,
    /// Seller the coupon belongs to. `None` for platform coupons.
    pub seller_id: Option<UserId>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub active: bool,
}

/// Normalize a user-entered coupon code.
///
/// Trims whitespace and uppercases. Returns `None` when the result is not a
/// syntactically valid code.
#[must_use]
pub fn normalize_code(input: &str) -> Option<String> {
    let code = input.trim().to_uppercase();
    let valid_len = (MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&code.len());
    let valid_chars = code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_');

    (valid_len && valid_chars).then_some(code)
}

impl Coupon {
    /// The part of the cart this coupon discounts.
    #[must_use]
    pub fn eligible_subtotal(&self, cart: &Cart) -> Decimal {
        match self.seller_id {
            Some(seller_id) => cart.seller_subtotal(seller_id),
            None => cart.subtotal(),
        }
    }

    /// Check whether the coupon can be used right now for the given subtotal.
    ///
    /// Checks run in a fixed order so the buyer sees the most fundamental
    /// problem first: inactive, not started, expired, exhausted, then the
    /// minimum order value.
    ///
    /// # Errors
    ///
    /// Returns the first [`CouponError`] that applies.
    pub fn check_eligibility(
        &self,
        eligible_subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), CouponError> {
        if !self.active {
            return Err(CouponError::Inactive);
        }

        if self.starts_at.is_some_and(|starts| now < starts) {
            return Err(CouponError::NotStarted);
        }

        if self.expires_at.is_some_and(|expires| now >= expires) {
            return Err(CouponError::Expired);
        }

        if self
            .usage_limit
            .is_some_and(|limit| self.used_count >= limit)
        {
            return Err(CouponError::Exhausted);
        }

        if eligible_subtotal <= Decimal::ZERO {
            return Err(CouponError::NotApplicable);
        }

        if let Some(minimum) = self.min_order_value
            && eligible_subtotal < minimum
        {
            return Err(CouponError::BelowMinimum { minimum });
        }

        Ok(())
    }

    /// Discount amount for an eligible subtotal.
    ///
    /// Never negative and never larger than the subtotal itself.
    #[must_use]
    pub fn discount_for(&self, eligible_subtotal: Decimal) -> Decimal {
        if eligible_subtotal <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let raw = match self.kind {
            CouponKind::Percentage => {
                let pct = round_money(eligible_subtotal * self.value / Decimal::ONE_HUNDRED);
                match self.max_discount {
                    Some(cap) if pct > cap => cap,
                    _ => pct,
                }
            }
            CouponKind::Fixed => self.value,
        };

        raw.max(Decimal::ZERO).min(eligible_subtotal)
    }

    /// Validate against a cart and return the discount.
    ///
    /// # Errors
    ///
    /// Returns a [`CouponError`] if the coupon cannot be used for this cart.
    pub fn apply_to(&self, cart: &Cart, now: DateTime<Utc>) -> Result<Decimal, CouponError> {
        let eligible = self.eligible_subtotal(cart);
        self.check_eligibility(eligible, now)?;
        Ok(self.discount_for(eligible))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::cart::CartLine;
    use crate::types::ProductId;

    fn coupon(kind: CouponKind, value: Decimal) -> Coupon {
        Coupon {
            id: CouponId::new(1),
            code: "SAVE".to_owned(),
            kind,
            value,
            min_order_value: None,
            max_discount: None,
            seller_id: None,
            starts_at: None,
            expires_at: None,
            usage_limit: None,
            used_count: 0,
            active: true,
        }
    }

    fn cart_with(lines: &[(i32, i32, i64)]) -> Cart {
        let mut cart = Cart::new();
        for &(product, seller, cents) in lines {
            cart.add(CartLine {
                product_id: ProductId::new(product),
                seller_id: UserId::new(seller),
                seller_name: String::new(),
                title: String::new(),
                unit_price: Decimal::new(cents, 2),
                quantity: 1,
                image_url: None,
            });
        }
        cart
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  save10 "), Some("SAVE10".to_owned()));
        assert_eq!(normalize_code("summer_sale-2"), Some("SUMMER_SALE-2".to_owned()));
        assert_eq!(normalize_code("ab"), None);
        assert_eq!(normalize_code("has space"), None);
        assert_eq!(normalize_code(&"X".repeat(33)), None);
    }

    #[test]
    fn test_percentage_discount_rounds_to_cents() {
        let c = coupon(CouponKind::Percentage, Decimal::new(15, 0));
        // 15% of 33.33 = 4.9995 -> 5.00
        assert_eq!(c.discount_for(Decimal::new(3333, 2)), Decimal::new(500, 2));
    }

    #[test]
    fn test_percentage_discount_capped() {
        let mut c = coupon(CouponKind::Percentage, Decimal::new(50, 0));
        c.max_discount = Some(Decimal::new(10, 0));
        assert_eq!(c.discount_for(Decimal::new(100, 0)), Decimal::new(10, 0));
    }

    #[test]
    fn test_fixed_discount_never_exceeds_subtotal() {
        let c = coupon(CouponKind::Fixed, Decimal::new(25, 0));
        assert_eq!(c.discount_for(Decimal::new(10, 0)), Decimal::new(10, 0));
        assert_eq!(c.discount_for(Decimal::new(40, 0)), Decimal::new(25, 0));
    }

    #[test]
    fn test_min_order_gating() {
        let mut c = coupon(CouponKind::Fixed, Decimal::new(5, 0));
        c.min_order_value = Some(Decimal::new(50, 0));
        let now = Utc::now();
        assert_eq!(
            c.check_eligibility(Decimal::new(49, 0), now),
            Err(CouponError::BelowMinimum {
                minimum: Decimal::new(50, 0)
            })
        );
        assert!(c.check_eligibility(Decimal::new(50, 0), now).is_ok());
    }

    #[test]
    fn test_eligibility_order_inactive_first() {
        let now = Utc::now();
        let mut c = coupon(CouponKind::Fixed, Decimal::ONE);
        c.active = false;
        c.expires_at = Some(now - Duration::days(1));
        assert_eq!(
            c.check_eligibility(Decimal::TEN, now),
            Err(CouponError::Inactive)
        );
    }

    #[test]
    fn test_window_checks() {
        let now = Utc::now();
        let mut c = coupon(CouponKind::Fixed, Decimal::ONE);
        c.starts_at = Some(now + Duration::hours(1));
        assert_eq!(
            c.check_eligibility(Decimal::TEN, now),
            Err(CouponError::NotStarted)
        );

        c.starts_at = None;
        c.expires_at = Some(now);
        assert_eq!(
            c.check_eligibility(Decimal::TEN, now),
            Err(CouponError::Expired)
        );
    }

    #[test]
    fn test_usage_limit() {
        let mut c = coupon(CouponKind::Fixed, Decimal::ONE);
        c.usage_limit = Some(3);
        c.used_count = 3;
        assert_eq!(
            c.check_eligibility(Decimal::TEN, Utc::now()),
            Err(CouponError::Exhausted)
        );
    }

    #[test]
    fn test_seller_coupon_only_counts_seller_lines() {
        let cart = cart_with(&[(1, 10, 2000), (2, 11, 5000)]);
        let mut c = coupon(CouponKind::Percentage, Decimal::new(10, 0));
        c.seller_id = Some(UserId::new(10));
        assert_eq!(c.eligible_subtotal(&cart), Decimal::new(2000, 2));
        assert_eq!(c.apply_to(&cart, Utc::now()).unwrap(), Decimal::new(200, 2));
    }

    #[test]
    fn test_seller_coupon_without_seller_lines() {
        let cart = cart_with(&[(2, 11, 5000)]);
        let mut c = coupon(CouponKind::Fixed, Decimal::ONE);
        c.seller_id = Some(UserId::new(10));
        assert_eq!(
            c.apply_to(&cart, Utc::now()),
            Err(CouponError::NotApplicable)
        );
    }

    #[test]
    fn test_below_minimum_message() {
        let err = CouponError::BelowMinimum {
            minimum: Decimal::new(2500, 2),
        };
        assert_eq!(err.to_string(), "spend at least $25.00 to use this coupon");
    }
}
