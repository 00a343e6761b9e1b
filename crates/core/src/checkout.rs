//! Checkout totals and the per-seller order split.
//!
//! A cart can hold products from several sellers. Checkout turns it into one
//! order per seller so each seller fulfils and tracks only their own items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartLine};
use crate::coupon::Coupon;
use crate::types::{UserId, round_money};

/// Platform shipping rules, applied per seller order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    /// Flat shipping fee per seller order.
    pub flat_rate: Decimal,
    /// Seller-order subtotal at which shipping becomes free.
    pub free_shipping_threshold: Option<Decimal>,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            flat_rate: Decimal::new(499, 2),
            free_shipping_threshold: Some(Decimal::new(50, 0)),
        }
    }
}

impl ShippingPolicy {
    /// Shipping fee for an order with the given pre-discount subtotal.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        match self.free_shipping_threshold {
            Some(threshold) if subtotal >= threshold => Decimal::ZERO,
            _ => self.flat_rate,
        }
    }
}

/// Money summary shown on the cart and checkout pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// One seller's share of a checkout, before it is written as an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellerOrderDraft {
    pub seller_id: UserId,
    pub seller_name: String,
    pub lines: Vec<CartLine>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

fn finish_total(subtotal: Decimal, discount: Decimal, shipping: Decimal) -> Decimal {
    (subtotal - discount + shipping).max(Decimal::ZERO)
}

/// Split a cart into one draft per seller and distribute the coupon discount.
///
/// `discount` is the already-validated discount for `coupon` (see
/// [`Coupon::apply_to`]). A seller coupon's discount lands on that seller's
/// draft. A platform coupon's discount is shared pro rata by subtotal; each
/// share is rounded to cents and the leftover cents go to the last drafts
/// that can still absorb them, so the shares always add up to `discount`.
#[must_use]
pub fn split_by_seller(
    cart: &Cart,
    coupon: Option<(&Coupon, Decimal)>,
    policy: &ShippingPolicy,
) -> Vec<SellerOrderDraft> {
    let mut drafts: Vec<SellerOrderDraft> = cart
        .sellers()
        .into_iter()
        .map(|seller_id| {
            let lines: Vec<CartLine> = cart
                .lines
                .iter()
                .filter(|l| l.seller_id == seller_id)
                .cloned()
                .collect();
            let subtotal: Decimal = lines.iter().map(CartLine::line_total).sum();
            let seller_name = lines
                .first()
                .map(|l| l.seller_name.clone())
                .unwrap_or_default();
            SellerOrderDraft {
                seller_id,
                seller_name,
                lines,
                subtotal,
                discount: Decimal::ZERO,
                shipping: policy.shipping_for(subtotal),
                total: Decimal::ZERO,
            }
        })
        .collect();

    if let Some((coupon, discount)) = coupon {
        allocate_discount(&mut drafts, coupon, discount);
    }

    for draft in &mut drafts {
        draft.total = finish_total(draft.subtotal, draft.discount, draft.shipping);
    }

    drafts
}

fn allocate_discount(drafts: &mut [SellerOrderDraft], coupon: &Coupon, discount: Decimal) {
    if discount <= Decimal::ZERO {
        return;
    }

    if let Some(seller_id) = coupon.seller_id {
        if let Some(draft) = drafts.iter_mut().find(|d| d.seller_id == seller_id) {
            draft.discount = discount.min(draft.subtotal);
        }
        return;
    }

    let cart_subtotal: Decimal = drafts.iter().map(|d| d.subtotal).sum();
    if cart_subtotal <= Decimal::ZERO {
        return;
    }

    let discount = discount.min(cart_subtotal);
    let mut remaining = discount;
    for draft in &mut *drafts {
        let share = round_money(discount * draft.subtotal / cart_subtotal)
            .min(draft.subtotal)
            .min(remaining)
            .max(Decimal::ZERO);
        draft.discount = share;
        remaining -= share;
    }

    // Rounding leftovers go to the latest drafts with room below their subtotal.
    for draft in drafts.iter_mut().rev() {
        if remaining <= Decimal::ZERO {
            break;
        }
        let extra = remaining.min(draft.subtotal - draft.discount);
        draft.discount += extra;
        remaining -= extra;
    }
}

/// Sum the drafts into the totals shown to the buyer.
#[must_use]
pub fn summarize(drafts: &[SellerOrderDraft]) -> CartTotals {
    drafts.iter().fold(CartTotals::default(), |acc, d| CartTotals {
        subtotal: acc.subtotal + d.subtotal,
        discount: acc.discount + d.discount,
        shipping: acc.shipping + d.shipping,
        total: acc.total + d.total,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::types::{CouponId, CouponKind, ProductId};

    fn cart(lines: &[(i32, i32, i64, u32)]) -> Cart {
        let mut cart = Cart::new();
        for &(product, seller, cents, qty) in lines {
            cart.add(CartLine {
                product_id: ProductId::new(product),
                seller_id: UserId::new(seller),
                seller_name: format!("Shop {seller}"),
                title: format!("Item {product}"),
                unit_price: Decimal::new(cents, 2),
                quantity: qty,
                image_url: None,
            });
        }
        cart
    }

    fn coupon(seller_id: Option<i32>) -> Coupon {
        Coupon {
            id: CouponId::new(1),
            code: "TEST".to_owned(),
            kind: CouponKind::Fixed,
            value: Decimal::TEN,
            min_order_value: None,
            max_discount: None,
            seller_id: seller_id.map(UserId::new),
            starts_at: None,
            expires_at: None,
            usage_limit: None,
            used_count: 0,
            active: true,
        }
    }

    fn no_shipping() -> ShippingPolicy {
        ShippingPolicy {
            flat_rate: Decimal::ZERO,
            free_shipping_threshold: None,
        }
    }

    #[test]
    fn test_shipping_free_over_threshold() {
        let policy = ShippingPolicy::default();
        assert_eq!(policy.shipping_for(Decimal::new(49, 0)), Decimal::new(499, 2));
        assert_eq!(policy.shipping_for(Decimal::new(50, 0)), Decimal::ZERO);
        assert_eq!(policy.shipping_for(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_split_one_draft_per_seller() {
        let cart = cart(&[(1, 10, 1000, 1), (2, 11, 2000, 2), (3, 10, 500, 1)]);
        let drafts = split_by_seller(&cart, None, &no_shipping());
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].seller_id, UserId::new(10));
        assert_eq!(drafts[0].lines.len(), 2);
        assert_eq!(drafts[0].subtotal, Decimal::new(1500, 2));
        assert_eq!(drafts[1].subtotal, Decimal::new(4000, 2));
    }

    #[test]
    fn test_seller_coupon_lands_on_seller() {
        let cart = cart(&[(1, 10, 3000, 1), (2, 11, 3000, 1)]);
        let c = coupon(Some(11));
        let drafts = split_by_seller(&cart, Some((&c, Decimal::TEN)), &no_shipping());
        assert_eq!(drafts[0].discount, Decimal::ZERO);
        assert_eq!(drafts[1].discount, Decimal::TEN);
        assert_eq!(drafts[1].total, Decimal::new(20, 0));
    }

    #[test]
    fn test_platform_coupon_allocations_sum_exactly() {
        // Subtotals 10, 10, 10; discount 10 -> 3.33, 3.33, 3.34
        let cart = cart(&[(1, 1, 1000, 1), (2, 2, 1000, 1), (3, 3, 1000, 1)]);
        let c = coupon(None);
        let drafts = split_by_seller(&cart, Some((&c, Decimal::TEN)), &no_shipping());
        let shares: Vec<Decimal> = drafts.iter().map(|d| d.discount).collect();
        assert_eq!(
            shares,
            vec![
                Decimal::new(333, 2),
                Decimal::new(333, 2),
                Decimal::new(334, 2)
            ]
        );
        assert_eq!(summarize(&drafts).discount, Decimal::TEN);
    }

    #[test]
    fn test_platform_coupon_remainder_spills_past_small_last_seller() {
        let cart = cart(&[(1, 1, 100, 1), (2, 2, 100, 1), (3, 3, 100, 1), (4, 4, 1, 1)]);
        let c = Coupon {
            value: Decimal::new(299, 2),
            ..coupon(None)
        };
        let discount = c.apply_to(&cart, chrono::Utc::now()).unwrap();
        assert_eq!(discount, Decimal::new(299, 2));

        let drafts = split_by_seller(&cart, Some((&c, discount)), &no_shipping());
        assert_eq!(summarize(&drafts).discount, discount);
        for draft in &drafts {
            assert!(draft.discount <= draft.subtotal);
            assert!(draft.discount >= Decimal::ZERO);
        }
        assert_eq!(drafts[3].discount, Decimal::new(1, 2));
    }

    #[test]
    fn test_platform_coupon_pro_rata() {
        let cart = cart(&[(1, 1, 7500, 1), (2, 2, 2500, 1)]);
        let c = coupon(None);
        let drafts = split_by_seller(&cart, Some((&c, Decimal::new(20, 0))), &no_shipping());
        assert_eq!(drafts[0].discount, Decimal::new(15, 0));
        assert_eq!(drafts[1].discount, Decimal::new(5, 0));
    }

    #[test]
    fn test_summarize_includes_shipping() {
        let cart = cart(&[(1, 1, 1000, 1), (2, 2, 6000, 1)]);
        let drafts = split_by_seller(&cart, None, &ShippingPolicy::default());
        let totals = summarize(&drafts);
        assert_eq!(totals.subtotal, Decimal::new(70, 0));
        // First seller under threshold pays shipping, second ships free.
        assert_eq!(totals.shipping, Decimal::new(499, 2));
        assert_eq!(totals.total, Decimal::new(7499, 2));
    }

    #[test]
    fn test_empty_cart_has_no_drafts() {
        let drafts = split_by_seller(&Cart::new(), None, &ShippingPolicy::default());
        assert!(drafts.is_empty());
        assert_eq!(summarize(&drafts), CartTotals::default());
    }
}
