//! User accounts.

use chrono::{DateTime, Utc};
use serde::Serialize;

use livestall_core::{AccountStatus, Email, UserId, UserRole};

/// A marketplace account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub display_name: String,
    pub role: UserRole,
    pub status: AccountStatus,
    pub email_verified: bool,
    pub identity_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub const fn is_suspended(&self) -> bool {
        matches!(self.status, AccountStatus::Suspended)
    }
}
