//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use livestall_core::{Email, UserId, UserRole};

use super::User;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the signed-in user. The
/// role is refreshed from the database whenever it changes through the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub display_name: String,
    pub role: UserRole,
    /// Set while an admin is acting as this user.
    #[serde(default)]
    pub impersonator: Option<Impersonator>,
}

/// The admin behind an impersonated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Impersonator {
    pub id: UserId,
    pub email: Email,
    pub display_name: String,
}

impl CurrentUser {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }

    #[must_use]
    pub const fn is_seller(&self) -> bool {
        self.role.can_sell()
    }

    #[must_use]
    pub const fn is_impersonating(&self) -> bool {
        self.impersonator.is_some()
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
            impersonator: None,
        }
    }
}

/// Session keys.
pub mod keys {
    /// The signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// The buyer's cart.
    pub const CART: &str = "cart";

    /// One-shot message shown on the next page render.
    pub const FLASH: &str = "flash";

    /// Email an OTP was sent to, awaiting verification.
    pub const OTP_EMAIL: &str = "otp_email";
}
