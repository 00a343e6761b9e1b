//! Platform-wide settings and identity verification sessions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use livestall_core::checkout::ShippingPolicy;
use livestall_core::{IdentitySessionId, IdentityStatus, UserId};

/// Settings an admin edits in the back-office, stored as one JSON value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSettings {
    /// Share of delivered sales kept by the platform, in percent.
    pub commission_percent: Decimal,
    pub flat_shipping_rate: Decimal,
    pub free_shipping_threshold: Option<Decimal>,
    /// Banner shown across the top of every page when set.
    pub announcement: Option<String>,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        let shipping = ShippingPolicy::default();
        Self {
            commission_percent: Decimal::TEN,
            flat_shipping_rate: shipping.flat_rate,
            free_shipping_threshold: shipping.free_shipping_threshold,
            announcement: None,
        }
    }
}

impl PlatformSettings {
    /// Key in the `setting` table.
    pub const KEY: &'static str = "platform";

    #[must_use]
    pub const fn shipping_policy(&self) -> ShippingPolicy {
        ShippingPolicy {
            flat_rate: self.flat_shipping_rate,
            free_shipping_threshold: self.free_shipping_threshold,
        }
    }
}

/// An identity verification attempt with the hosted provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct IdentitySession {
    pub id: IdentitySessionId,
    pub user_id: UserId,
    pub reference: Uuid,
    pub status: IdentityStatus,
    pub hosted_url: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_fill_missing_fields_with_defaults() {
        let settings: PlatformSettings =
            serde_json::from_str(r#"{"commission_percent": "12.5"}"#).unwrap();
        assert_eq!(settings.commission_percent, Decimal::new(125, 1));
        assert_eq!(settings.flat_shipping_rate, Decimal::new(499, 2));
        assert!(settings.announcement.is_none());
    }

    #[test]
    fn test_shipping_policy_from_settings() {
        let settings = PlatformSettings {
            flat_shipping_rate: Decimal::new(3, 0),
            free_shipping_threshold: None,
            ..PlatformSettings::default()
        };
        let policy = settings.shipping_policy();
        assert_eq!(policy.shipping_for(Decimal::new(500, 0)), Decimal::new(3, 0));
    }
}
