//! One-time passcodes for email sign-in and verification.
//!
//! Codes are six digits. Only the SHA-256 hash of a code is ever stored.

use chrono::Duration;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Number of digits in a code.
pub const CODE_LENGTH: usize = 6;

/// How long a code stays valid.
pub const CODE_TTL_MINUTES: i64 = 10;

/// Wrong guesses allowed before a code is burned.
pub const MAX_FAILED_ATTEMPTS: i32 = 5;

/// Validity window of a freshly issued code.
#[must_use]
pub fn code_ttl() -> Duration {
    Duration::minutes(CODE_TTL_MINUTES)
}

/// Generate a random six-digit code.
#[must_use]
pub fn generate_code() -> String {
    let n: u32 = rand::rng().random_range(100_000..=999_999);
    n.to_string()
}

/// Normalize a user-entered code.
///
/// Trims and removes inner spaces (`"123 456"` is accepted). Returns `None`
/// unless the result is exactly six ASCII digits.
#[must_use]
pub fn normalize_code(input: &str) -> Option<String> {
    let code: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    (code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit())).then_some(code)
}

/// SHA-256 hex digest of a normalized code.
#[must_use]
pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

/// Purpose of an issued code, stored next to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    SignIn,
    Verify,
}

impl OtpPurpose {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SignIn => "sign_in",
            Self::Verify => "verify",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(normalize_code(&code).is_some());
            assert!(!code.starts_with('0'));
        }
    }

    #[test]
    fn test_normalize_strips_spaces() {
        assert_eq!(normalize_code(" 123 456 "), Some("123456".to_owned()));
    }

    #[test]
    fn test_normalize_rejects_bad_input() {
        assert_eq!(normalize_code("12345"), None);
        assert_eq!(normalize_code("1234567"), None);
        assert_eq!(normalize_code("12a456"), None);
        assert_eq!(normalize_code(""), None);
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let hash = hash_code("123456");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_code("123456"));
        assert_ne!(hash, hash_code("654321"));
        assert!(hash.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn test_ttl() {
        assert_eq!(code_ttl().num_minutes(), 10);
    }
}
