//! Shopping cart kept in the buyer's session.
//!
//! The cart is a plain serializable value: the web layer loads it from the
//! session, applies one operation, and writes it back. Prices on cart lines
//! are snapshots for display; checkout re-reads current prices.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, UserId};

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub seller_id: UserId,
    pub seller_name: String,
    pub title: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub image_url: Option<String>,
}

impl CartLine {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A buyer's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
    /// Normalized coupon code the buyer applied, if any.
    #[serde(default)]
    pub coupon_code: Option<String>,
}

const fn clamp_quantity(quantity: u32) -> u32 {
    if quantity == 0 {
        1
    } else if quantity > MAX_LINE_QUANTITY {
        MAX_LINE_QUANTITY
    } else {
        quantity
    }
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line, merging quantities with an existing line for the same product.
    ///
    /// The incoming line's price and title replace the stored snapshot.
    pub fn add(&mut self, mut line: CartLine) {
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            existing.quantity = clamp_quantity(existing.quantity.saturating_add(line.quantity));
            existing.unit_price = line.unit_price;
            existing.title = line.title;
            existing.image_url = line.image_url;
            return;
        }

        line.quantity = clamp_quantity(line.quantity);
        self.lines.push(line);
    }

    /// Set the quantity for a product. Zero removes the line.
    ///
    /// Returns `false` if the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(product_id);
        }

        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => {
                line.quantity = clamp_quantity(quantity);
                true
            }
            None => false,
        }
    }

    /// Remove a product from the cart. Returns `true` if a line was removed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    /// Remove every line and any applied coupon.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.coupon_code = None;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |acc, l| acc.saturating_add(l.quantity))
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Sum of line totals for one seller's products.
    #[must_use]
    pub fn seller_subtotal(&self, seller_id: UserId) -> Decimal {
        self.lines
            .iter()
            .filter(|l| l.seller_id == seller_id)
            .map(CartLine::line_total)
            .sum()
    }

    /// Distinct sellers in the order their products were first added.
    #[must_use]
    pub fn sellers(&self) -> Vec<UserId> {
        let mut sellers = Vec::new();
        for line in &self.lines {
            if !sellers.contains(&line.seller_id) {
                sellers.push(line.seller_id);
            }
        }
        sellers
    }

    /// Look up a line by product.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(product: i32, seller: i32, cents: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(product),
            seller_id: UserId::new(seller),
            seller_name: format!("Seller {seller}"),
            title: format!("Product {product}"),
            unit_price: Decimal::new(cents, 2),
            quantity,
            image_url: None,
        }
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = Cart::new();
        cart.add(line(1, 10, 500, 2));
        cart.add(line(1, 10, 500, 3));
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_add_clamps_quantity() {
        let mut cart = Cart::new();
        cart.add(line(1, 10, 500, 0));
        assert_eq!(cart.line(ProductId::new(1)).unwrap().quantity, 1);

        cart.add(line(1, 10, 500, 500));
        assert_eq!(
            cart.line(ProductId::new(1)).unwrap().quantity,
            MAX_LINE_QUANTITY
        );
    }

    #[test]
    fn test_add_refreshes_price_snapshot() {
        let mut cart = Cart::new();
        cart.add(line(1, 10, 500, 1));
        cart.add(line(1, 10, 450, 1));
        assert_eq!(
            cart.line(ProductId::new(1)).unwrap().unit_price,
            Decimal::new(450, 2)
        );
    }

    #[test]
    fn test_subtotal_sums_lines() {
        let mut cart = Cart::new();
        cart.add(line(1, 10, 1999, 2)); // 39.98
        cart.add(line(2, 11, 550, 1)); // 5.50
        assert_eq!(cart.subtotal(), Decimal::new(4548, 2));
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::new();
        cart.add(line(1, 10, 500, 2));
        assert!(cart.set_quantity(ProductId::new(1), 0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_unknown_product() {
        let mut cart = Cart::new();
        assert!(!cart.set_quantity(ProductId::new(9), 3));
    }

    #[test]
    fn test_remove_reports_whether_removed() {
        let mut cart = Cart::new();
        cart.add(line(1, 10, 500, 1));
        assert!(cart.remove(ProductId::new(1)));
        assert!(!cart.remove(ProductId::new(1)));
    }

    #[test]
    fn test_sellers_in_first_seen_order() {
        let mut cart = Cart::new();
        cart.add(line(1, 12, 100, 1));
        cart.add(line(2, 10, 100, 1));
        cart.add(line(3, 12, 100, 1));
        assert_eq!(cart.sellers(), vec![UserId::new(12), UserId::new(10)]);
        assert_eq!(cart.seller_subtotal(UserId::new(12)), Decimal::new(200, 2));
    }

    #[test]
    fn test_clear_drops_coupon() {
        let mut cart = Cart::new();
        cart.add(line(1, 10, 100, 1));
        cart.coupon_code = Some("SAVE10".to_owned());
        cart.clear();
        assert!(cart.is_empty());
        assert!(cart.coupon_code.is_none());
    }

    #[test]
    fn test_empty_cart_subtotal_is_zero() {
        assert_eq!(Cart::new().subtotal(), Decimal::ZERO);
        assert_eq!(Cart::new().item_count(), 0);
    }
}
