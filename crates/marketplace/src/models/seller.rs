//! Seller center models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use livestall_core::{
    LiveStreamId, LiveStreamStatus, PayoutId, PayoutStatus, ProductId, SellerApplicationId,
    SellerApplicationStatus, UserId,
};

/// A customer's request to become a seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct SellerApplication {
    pub id: SellerApplicationId,
    pub user_id: UserId,
    pub applicant_email: String,
    pub applicant_name: String,
    pub store_name: String,
    pub phone: String,
    pub description: String,
    pub payout_account: String,
    pub status: SellerApplicationStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// An approved seller's store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct SellerProfile {
    pub user_id: UserId,
    pub public_id: String,
    pub store_name: String,
    pub phone: String,
    pub description: String,
    pub payout_account: String,
    pub welcome_seen: bool,
    pub created_at: DateTime<Utc>,
}

/// A payout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Payout {
    pub id: PayoutId,
    pub public_id: String,
    pub seller_id: UserId,
    pub store_name: String,
    pub amount: Decimal,
    pub status: PayoutStatus,
    pub note: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// A scheduled, running, or finished live selling session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct LiveStream {
    pub id: LiveStreamId,
    pub seller_id: UserId,
    pub store_name: String,
    pub title: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: LiveStreamStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Featured products, loaded separately.
    #[sqlx(skip)]
    pub product_ids: Vec<ProductId>,
}

/// Figures on the seller dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SellerDashboard {
    pub product_count: i64,
    pub open_orders: i64,
    pub gross_sales: Decimal,
    pub pending_payouts: Decimal,
    pub available_balance: Decimal,
}

/// Money a seller can still request as a payout.
///
/// Delivered order totals, minus the platform commission, minus payouts that
/// are requested, approved, or paid. Never negative.
#[must_use]
pub fn available_balance(
    delivered_total: Decimal,
    commission_percent: Decimal,
    reserved_payouts: Decimal,
) -> Decimal {
    let commission = livestall_core::round_money(
        delivered_total * commission_percent / Decimal::ONE_HUNDRED,
    );
    (delivered_total - commission - reserved_payouts).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_balance() {
        // 200 delivered, 10% commission, 50 already requested -> 130
        let balance = available_balance(Decimal::new(200, 0), Decimal::TEN, Decimal::new(50, 0));
        assert_eq!(balance, Decimal::new(130, 0));
    }

    #[test]
    fn test_available_balance_never_negative() {
        let balance = available_balance(Decimal::TEN, Decimal::TEN, Decimal::new(50, 0));
        assert_eq!(balance, Decimal::ZERO);
    }
}
