//! Human-facing sequential identifiers such as `ORD-000042`.
//!
//! The numbers come from a per-kind counter in the database; this module
//! only formats and parses them.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum number of digits after the prefix.
pub const MIN_DIGITS: usize = 6;

/// What a public ID identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicIdKind {
    Order,
    Seller,
    Payout,
}

impl PublicIdKind {
    pub const ALL: &'static [Self] = &[Self::Order, Self::Seller, Self::Payout];

    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::Order => "ORD",
            Self::Seller => "SEL",
            Self::Payout => "PAY",
        }
    }

    /// Counter name in the `public_id_counter` table.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Seller => "seller",
            Self::Payout => "payout",
        }
    }
}

impl FromStr for PublicIdKind {
    type Err = PublicIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order" => Ok(Self::Order),
            "seller" => Ok(Self::Seller),
            "payout" => Ok(Self::Payout),
            other => Err(PublicIdError::UnknownKind(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublicIdError {
    #[error("unknown public id kind: {0}")]
    UnknownKind(String),
    #[error("malformed public id: {0}")]
    Malformed(String),
}

/// A formatted public ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicId {
    pub kind: PublicIdKind,
    pub number: u64,
}

impl PublicId {
    #[must_use]
    pub const fn new(kind: PublicIdKind, number: u64) -> Self {
        Self { kind, number }
    }

    /// Parse `"ORD-000042"` style strings.
    ///
    /// # Errors
    ///
    /// Returns [`PublicIdError::Malformed`] if the prefix is unknown or the
    /// number part is not at least six digits.
    pub fn parse(s: &str) -> Result<Self, PublicIdError> {
        let malformed = || PublicIdError::Malformed(s.to_owned());
        let (prefix, digits) = s.split_once('-').ok_or_else(malformed)?;
        let kind = PublicIdKind::ALL
            .iter()
            .copied()
            .find(|k| k.prefix() == prefix)
            .ok_or_else(malformed)?;
        if digits.len() < MIN_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let number = digits.parse().map_err(|_| malformed())?;
        Ok(Self { kind, number })
    }
}

impl fmt::Display for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:0width$}", self.kind.prefix(), self.number, width = MIN_DIGITS)
    }
}

/// Format a counter value, e.g. `format(PublicIdKind::Order, 42)` is `"ORD-000042"`.
#[must_use]
pub fn format(kind: PublicIdKind, number: u64) -> String {
    PublicId::new(kind, number).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pads_to_six() {
        assert_eq!(format(PublicIdKind::Order, 42), "ORD-000042");
        assert_eq!(format(PublicIdKind::Seller, 1), "SEL-000001");
    }

    #[test]
    fn test_format_grows_past_six_digits() {
        assert_eq!(format(PublicIdKind::Payout, 1_234_567), "PAY-1234567");
    }

    #[test]
    fn test_parse_inverse_of_format() {
        let id = PublicId::parse("ORD-000042").unwrap();
        assert_eq!(id, PublicId::new(PublicIdKind::Order, 42));
        assert_eq!(id.to_string(), "ORD-000042");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(PublicId::parse("ORD42").is_err());
        assert!(PublicId::parse("XYZ-000001").is_err());
        assert!(PublicId::parse("ORD-42").is_err());
        assert!(PublicId::parse("ORD-00004a").is_err());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("payout".parse::<PublicIdKind>().unwrap(), PublicIdKind::Payout);
        assert!("invoice".parse::<PublicIdKind>().is_err());
    }
}
