//! Orders placed at checkout, one per seller.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use livestall_core::timeline::OrderTimeline;
use livestall_core::{OrderId, OrderItemId, OrderStage, ProductId, UserId};

/// Where an order ships to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
}

impl ShippingAddress {
    /// Names of empty required fields.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("address", &self.address),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
            ("phone", &self.phone),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect()
    }

    /// Single-line form for emails and lists.
    #[must_use]
    pub fn one_line(&self) -> String {
        format!(
            "{}, {}, {} {}, {}",
            self.name, self.address, self.postal_code, self.city, self.country
        )
    }
}

/// A seller order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub public_id: String,
    pub buyer_id: UserId,
    pub buyer_name: String,
    pub seller_id: UserId,
    pub seller_name: String,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub coupon_code: Option<String>,
    pub shipping_address: ShippingAddress,
    pub stage: OrderStage,
    pub timeline: OrderTimeline,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn status_label(&self) -> &str {
        self.timeline.current_status()
    }

    /// The buyer may still cancel.
    #[must_use]
    pub fn can_cancel(&self) -> bool {
        matches!(self.stage, OrderStage::Placed | OrderStage::Confirmed)
    }
}

/// A line on an order, with price frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub title: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields() {
        let address = ShippingAddress {
            name: "Ada".to_owned(),
            address: "1 Loop Rd".to_owned(),
            city: " ".to_owned(),
            ..ShippingAddress::default()
        };
        assert_eq!(
            address.missing_fields(),
            vec!["city", "postal_code", "country", "phone"]
        );
    }
}
