//! Status enums for marketplace entities.
//!
//! Every enum serializes as `snake_case`, which is also the label stored in
//! the matching Postgres enum type (schema `marketplace`).

use serde::{Deserialize, Serialize};

/// Implements `as_str`, `Display`, and `FromStr` for a snake_case status enum.
macro_rules! status_strings {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The `snake_case` name used on the wire and in the database.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", $label, ": {}"), s)),
                }
            }
        }
    };
}

/// Marketplace user role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "marketplace.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Browses, buys, and messages sellers.
    #[default]
    Customer,
    /// Lists products, runs coupons and live streams.
    Seller,
    /// Moderates users and content, configures the platform.
    Admin,
}

status_strings!(UserRole, "user role", {
    Customer => "customer",
    Seller => "seller",
    Admin => "admin",
});

impl UserRole {
    /// Whether this role can use the seller center.
    #[must_use]
    pub const fn can_sell(&self) -> bool {
        matches!(self, Self::Seller | Self::Admin)
    }
}

/// Whether an account may sign in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "marketplace.account_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
}

status_strings!(AccountStatus, "account status", {
    Active => "active",
    Suspended => "suspended",
});

/// Product listing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "marketplace.product_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Not yet visible to buyers.
    #[default]
    Draft,
    /// Listed in the catalog.
    Active,
    /// Removed by moderation. Only an admin can restore it.
    Hidden,
    /// Retired by the seller.
    Archived,
}

status_strings!(ProductStatus, "product status", {
    Draft => "draft",
    Active => "active",
    Hidden => "hidden",
    Archived => "archived",
});

impl ProductStatus {
    /// Statuses a seller may set on their own listing.
    pub const SELLER_SETTABLE: &'static [Self] = &[Self::Draft, Self::Active, Self::Archived];

    /// Whether buyers can see and purchase the product.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Seller application review status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(
        type_name = "marketplace.seller_application_status",
        rename_all = "snake_case"
    )
)]
#[serde(rename_all = "snake_case")]
pub enum SellerApplicationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

status_strings!(SellerApplicationStatus, "seller application status", {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

/// Seller payout status.
///
/// `requested -> approved -> paid`, or `requested -> rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "marketplace.payout_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    #[default]
    Requested,
    Approved,
    Paid,
    Rejected,
}

status_strings!(PayoutStatus, "payout status", {
    Requested => "requested",
    Approved => "approved",
    Paid => "paid",
    Rejected => "rejected",
});

impl PayoutStatus {
    /// Whether an admin may move a payout from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Requested, Self::Approved | Self::Rejected) | (Self::Approved, Self::Paid)
        )
    }
}

/// Live stream lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "marketplace.live_stream_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum LiveStreamStatus {
    #[default]
    Scheduled,
    Live,
    Ended,
}

status_strings!(LiveStreamStatus, "live stream status", {
    Scheduled => "scheduled",
    Live => "live",
    Ended => "ended",
});

/// Order fulfillment stage.
///
/// Declaration order is the forward order of the standard timeline;
/// `Cancelled` sits outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "marketplace.order_stage", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStage {
    Placed,
    Confirmed,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
}

status_strings!(OrderStage, "order stage", {
    Placed => "placed",
    Confirmed => "confirmed",
    Shipped => "shipped",
    OutForDelivery => "out_for_delivery",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStage {
    /// Human-readable label shown on order pages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Placed => "Order Placed",
            Self::Confirmed => "Confirmed",
            Self::Shipped => "Shipped",
            Self::OutForDelivery => "Out for Delivery",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// Coupon discount kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "marketplace.coupon_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    /// `value` is a percentage of the eligible subtotal.
    Percentage,
    /// `value` is a flat amount off.
    Fixed,
}

status_strings!(CouponKind, "coupon kind", {
    Percentage => "percentage",
    Fixed => "fixed",
});

/// Identity verification session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "marketplace.identity_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStatus {
    #[default]
    Pending,
    Verified,
    Failed,
}

status_strings!(IdentityStatus, "identity status", {
    Pending => "pending",
    Verified => "verified",
    Failed => "failed",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_roundtrip_strings() {
        for role in UserRole::ALL {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), *role);
        }
    }

    #[test]
    fn test_from_str_error_names_type() {
        let err = "owner".parse::<UserRole>().unwrap_err();
        assert_eq!(err, "invalid user role: owner");
    }

    #[test]
    fn test_order_stage_serde_snake_case() {
        let json = serde_json::to_string(&OrderStage::OutForDelivery).unwrap();
        assert_eq!(json, "\"out_for_delivery\"");
    }

    #[test]
    fn test_order_stage_forward_ordering() {
        assert!(OrderStage::Placed < OrderStage::Shipped);
        assert!(OrderStage::Shipped < OrderStage::Delivered);
    }

    #[test]
    fn test_payout_transitions() {
        assert!(PayoutStatus::Requested.can_transition_to(PayoutStatus::Approved));
        assert!(PayoutStatus::Requested.can_transition_to(PayoutStatus::Rejected));
        assert!(PayoutStatus::Approved.can_transition_to(PayoutStatus::Paid));
        assert!(!PayoutStatus::Paid.can_transition_to(PayoutStatus::Requested));
        assert!(!PayoutStatus::Rejected.can_transition_to(PayoutStatus::Approved));
        assert!(!PayoutStatus::Requested.can_transition_to(PayoutStatus::Paid));
    }

    #[test]
    fn test_role_can_sell() {
        assert!(!UserRole::Customer.can_sell());
        assert!(UserRole::Seller.can_sell());
        assert!(UserRole::Admin.can_sell());
    }

    #[test]
    fn test_only_active_products_are_purchasable() {
        assert!(ProductStatus::Active.is_purchasable());
        assert!(!ProductStatus::Hidden.is_purchasable());
        assert!(!ProductStatus::Draft.is_purchasable());
    }
}
