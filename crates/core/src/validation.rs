//! Form validation.
//!
//! Each input struct mirrors an HTML form: fields arrive as strings and
//! `validate` either returns the parsed, trimmed values or a
//! [`ValidationErrors`] listing every problem by field, in form order.

use core::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::coupon::normalize_code;
use crate::types::CouponKind;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Highest price a product may be listed at.
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Highest stock level a product may hold.
pub const MAX_STOCK: i32 = 100_000;

/// Field errors, kept in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(Vec<(&'static str, String)>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push((field, message.into()));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// First message overall, for forms that show a single error banner.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(|(_, m)| m.as_str())
    }

    /// First message for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, m)| m.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }

    /// `Ok(value)` if no errors were recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` if any error was recorded.
    pub fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.0.iter().map(|(_, m)| m.as_str()).collect();
        f.write_str(&joined.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn check_length(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    value: &str,
    min: usize,
    max: usize,
) {
    let len = char_len(value);
    if len < min {
        if min == 1 {
            errors.add(field, format!("{label} is required"));
        } else {
            errors.add(field, format!("{label} must be at least {min} characters"));
        }
    } else if len > max {
        errors.add(field, format!("{label} must be at most {max} characters"));
    }
}

/// Parse a money amount typed into a form ("12.5", "$12.50").
#[must_use]
pub fn parse_money(input: &str) -> Option<Decimal> {
    let trimmed = input.trim().trim_start_matches('$').replace(',', "");
    trimmed.parse::<Decimal>().ok()
}

fn parse_optional_money(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    input: &str,
) -> Option<Decimal> {
    if input.trim().is_empty() {
        return None;
    }
    match parse_money(input) {
        Some(v) if v > Decimal::ZERO => Some(v),
        Some(_) => {
            errors.add(field, format!("{label} must be greater than zero"));
            None
        }
        None => {
            errors.add(field, format!("{label} must be a number"));
            None
        }
    }
}

/// Parse an `<input type="datetime-local">` value as UTC.
#[must_use]
pub fn parse_datetime_local(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    pub stock: String,
    pub category: String,
}

/// A validated product form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFields {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub category: String,
}

impl ProductInput {
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(&self) -> Result<ProductFields, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = self.title.trim();
        check_length(&mut errors, "title", "Title", title, 3, 120);

        let description = self.description.trim();
        check_length(&mut errors, "description", "Description", description, 0, 5000);

        let price = match parse_money(&self.price) {
            Some(p) if p <= Decimal::ZERO => {
                errors.add("price", "Price must be greater than zero");
                Decimal::ZERO
            }
            Some(p) if p > MAX_PRICE => {
                errors.add("price", "Price must be at most 1,000,000");
                Decimal::ZERO
            }
            Some(p) => p,
            None => {
                errors.add("price", "Price must be a number");
                Decimal::ZERO
            }
        };

        let stock = match self.stock.trim().parse::<i32>() {
            Ok(s) if (0..=MAX_STOCK).contains(&s) => s,
            Ok(_) => {
                errors.add("stock", "Stock must be between 0 and 100,000");
                0
            }
            Err(_) => {
                errors.add("stock", "Stock must be a whole number");
                0
            }
        };

        let category = self.category.trim();
        check_length(&mut errors, "category", "Category", category, 1, 60);

        errors.finish(ProductFields {
            title: title.to_owned(),
            description: description.to_owned(),
            price,
            stock,
            category: category.to_owned(),
        })
    }
}

// =============================================================================
// Seller applications
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SellerApplicationInput {
    pub store_name: String,
    pub phone: String,
    #[serde(default)]
    pub description: String,
    pub payout_account: String,
}

fn valid_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c == ' ' || c == '-');
    allowed && (7..=20).contains(&digits)
}

impl SellerApplicationInput {
    /// Returns a trimmed copy on success.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let store_name = self.store_name.trim();
        check_length(&mut errors, "store_name", "Store name", store_name, 3, 60);

        let phone = self.phone.trim();
        if !valid_phone(phone) {
            errors.add("phone", "Enter a phone number with 7 to 20 digits");
        }

        let description = self.description.trim();
        check_length(&mut errors, "description", "Description", description, 0, 1000);

        let payout_account = self.payout_account.trim();
        check_length(&mut errors, "payout_account", "Payout account", payout_account, 1, 120);

        errors.finish(Self {
            store_name: store_name.to_owned(),
            phone: phone.to_owned(),
            description: description.to_owned(),
            payout_account: payout_account.to_owned(),
        })
    }
}

// =============================================================================
// Coupons
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponInput {
    pub code: String,
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub min_order_value: String,
    #[serde(default)]
    pub max_discount: String,
    #[serde(default)]
    pub starts_at: String,
    #[serde(default)]
    pub expires_at: String,
    #[serde(default)]
    pub usage_limit: String,
}

/// A validated coupon form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponFields {
    pub code: String,
    pub kind: CouponKind,
    pub value: Decimal,
    pub min_order_value: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
}

fn parse_optional_datetime(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    input: &str,
) -> Option<DateTime<Utc>> {
    if input.trim().is_empty() {
        return None;
    }
    let parsed = parse_datetime_local(input);
    if parsed.is_none() {
        errors.add(field, format!("{label} is not a valid date"));
    }
    parsed
}

impl CouponInput {
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(&self) -> Result<CouponFields, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let code = normalize_code(&self.code).unwrap_or_else(|| {
            errors.add(
                "code",
                "Code must be 3 to 32 letters, digits, dashes or underscores",
            );
            String::new()
        });

        let kind = self.kind.parse::<CouponKind>().unwrap_or_else(|_| {
            errors.add("kind", "Choose percentage or fixed amount");
            CouponKind::Fixed
        });

        let value = match parse_money(&self.value) {
            Some(v) if v <= Decimal::ZERO => {
                errors.add("value", "Value must be greater than zero");
                v
            }
            Some(v) if kind == CouponKind::Percentage && v > Decimal::ONE_HUNDRED => {
                errors.add("value", "Percentage must be at most 100");
                v
            }
            Some(v) => v,
            None => {
                errors.add("value", "Value must be a number");
                Decimal::ZERO
            }
        };

        let min_order_value =
            parse_optional_money(&mut errors, "min_order_value", "Minimum order", &self.min_order_value);
        let max_discount =
            parse_optional_money(&mut errors, "max_discount", "Maximum discount", &self.max_discount);

        let starts_at = parse_optional_datetime(&mut errors, "starts_at", "Start date", &self.starts_at);
        let expires_at =
            parse_optional_datetime(&mut errors, "expires_at", "Expiry date", &self.expires_at);
        if let (Some(starts), Some(expires)) = (starts_at, expires_at)
            && expires <= starts
        {
            errors.add("expires_at", "Expiry must be after the start date");
        }

        let usage_limit = if self.usage_limit.trim().is_empty() {
            None
        } else {
            match self.usage_limit.trim().parse::<i32>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    errors.add("usage_limit", "Usage limit must be a positive whole number");
                    None
                }
            }
        };

        errors.finish(CouponFields {
            code,
            kind,
            value,
            min_order_value,
            max_discount,
            starts_at,
            expires_at,
            usage_limit,
        })
    }
}

// =============================================================================
// Accounts, messages, Q&A
// =============================================================================

/// Check a new password and its confirmation.
///
/// # Errors
///
/// Returns field errors for a short password or a mismatched confirmation.
pub fn validate_password(password: &str, confirm: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if char_len(password) < MIN_PASSWORD_LENGTH {
        errors.add(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        );
    }
    if password != confirm {
        errors.add("password_confirm", "Passwords do not match");
    }
    errors.finish(())
}

/// Trimmed display name, 1-60 characters.
///
/// # Errors
///
/// Returns a field error when the name is empty or too long.
pub fn validate_display_name(name: &str) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = name.trim();
    check_length(&mut errors, "display_name", "Name", name, 1, 60);
    errors.finish(name.to_owned())
}

/// Trimmed message body, 1-2000 characters.
///
/// # Errors
///
/// Returns a field error when the body is empty or too long.
pub fn validate_message(body: &str) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let body = body.trim();
    check_length(&mut errors, "body", "Message", body, 1, 2000);
    errors.finish(body.to_owned())
}

/// Trimmed product question, 5-500 characters.
///
/// # Errors
///
/// Returns a field error when the question is too short or too long.
pub fn validate_question(body: &str) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let body = body.trim();
    check_length(&mut errors, "question", "Question", body, 5, 500);
    errors.finish(body.to_owned())
}

/// Trimmed answer, 1-1000 characters.
///
/// # Errors
///
/// Returns a field error when the answer is empty or too long.
pub fn validate_answer(body: &str) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let body = body.trim();
    check_length(&mut errors, "answer", "Answer", body, 1, 1000);
    errors.finish(body.to_owned())
}

// =============================================================================
// Platform settings
// =============================================================================

/// The back-office settings form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsInput {
    pub commission_percent: String,
    pub flat_shipping_rate: String,
    /// Empty disables free shipping.
    #[serde(default)]
    pub free_shipping_threshold: String,
    #[serde(default)]
    pub announcement: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsFields {
    pub commission_percent: Decimal,
    pub flat_shipping_rate: Decimal,
    pub free_shipping_threshold: Option<Decimal>,
    pub announcement: Option<String>,
}

impl SettingsInput {
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(&self) -> Result<SettingsFields, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let commission_percent = match parse_money(&self.commission_percent) {
            Some(p) if p >= Decimal::ZERO && p <= Decimal::ONE_HUNDRED => p,
            _ => {
                errors.add("commission_percent", "Commission must be between 0 and 100");
                Decimal::ZERO
            }
        };

        let flat_shipping_rate = match parse_money(&self.flat_shipping_rate) {
            Some(r) if r >= Decimal::ZERO => r,
            _ => {
                errors.add("flat_shipping_rate", "Shipping rate must be zero or more");
                Decimal::ZERO
            }
        };

        let free_shipping_threshold = parse_optional_money(
            &mut errors,
            "free_shipping_threshold",
            "Free shipping threshold",
            &self.free_shipping_threshold,
        );

        let announcement = self.announcement.trim();
        check_length(&mut errors, "announcement", "Announcement", announcement, 0, 280);

        errors.finish(SettingsFields {
            commission_percent,
            flat_shipping_rate,
            free_shipping_threshold,
            announcement: (!announcement.is_empty()).then(|| announcement.to_owned()),
        })
    }
}

// =============================================================================
// Live streams
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveStreamInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// `datetime-local` value.
    pub scheduled_at: String,
}

/// A validated live stream form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveStreamFields {
    pub title: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
}

impl LiveStreamInput {
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(&self) -> Result<LiveStreamFields, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = self.title.trim();
        check_length(&mut errors, "title", "Title", title, 3, 120);

        let description = self.description.trim();
        check_length(&mut errors, "description", "Description", description, 0, 1000);

        let scheduled_at = parse_datetime_local(&self.scheduled_at);
        if scheduled_at.is_none() {
            errors.add("scheduled_at", "Pick a date and time");
        }

        match scheduled_at {
            Some(scheduled_at) if errors.is_empty() => Ok(LiveStreamFields {
                title: title.to_owned(),
                description: description.to_owned(),
                scheduled_at,
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product() -> ProductInput {
        ProductInput {
            title: "Hand-thrown mug".to_owned(),
            description: "Stoneware, 350 ml".to_owned(),
            price: "24.50".to_owned(),
            stock: "12".to_owned(),
            category: "Kitchen".to_owned(),
        }
    }

    #[test]
    fn test_valid_product() {
        let fields = product().validate().unwrap();
        assert_eq!(fields.price, Decimal::new(2450, 2));
        assert_eq!(fields.stock, 12);
    }

    #[test]
    fn test_product_errors_in_form_order() {
        let input = ProductInput {
            title: "ab".to_owned(),
            price: "0".to_owned(),
            stock: "-1".to_owned(),
            category: "  ".to_owned(),
            ..product()
        };
        let errors = input.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["title", "price", "stock", "category"]);
        assert_eq!(errors.first(), Some("Title must be at least 3 characters"));
    }

    #[test]
    fn test_product_price_bounds() {
        let too_high = ProductInput {
            price: "1000000.01".to_owned(),
            ..product()
        };
        assert!(too_high.validate().unwrap_err().get("price").is_some());

        let max = ProductInput {
            price: "1000000".to_owned(),
            ..product()
        };
        assert!(max.validate().is_ok());

        let junk = ProductInput {
            price: "abc".to_owned(),
            ..product()
        };
        assert_eq!(
            junk.validate().unwrap_err().get("price"),
            Some("Price must be a number")
        );
    }

    #[test]
    fn test_parse_money_accepts_symbol() {
        assert_eq!(parse_money("$1,250.00"), Some(Decimal::new(125_000, 2)));
        assert_eq!(parse_money(""), None);
    }

    #[test]
    fn test_seller_application_phone() {
        let mut input = SellerApplicationInput {
            store_name: "Clay Corner".to_owned(),
            phone: "+1 555-123-4567".to_owned(),
            description: String::new(),
            payout_account: "IBAN DE00 1234".to_owned(),
        };
        assert!(input.validate().is_ok());

        input.phone = "555-12".to_owned();
        assert!(input.validate().unwrap_err().get("phone").is_some());

        input.phone = "(555) 123 4567".to_owned();
        assert!(input.validate().unwrap_err().get("phone").is_some());
    }

    #[test]
    fn test_coupon_percentage_bounds() {
        let mut input = CouponInput {
            code: "spring10".to_owned(),
            kind: "percentage".to_owned(),
            value: "100".to_owned(),
            ..CouponInput::default()
        };
        let fields = input.validate().unwrap();
        assert_eq!(fields.code, "SPRING10");
        assert_eq!(fields.kind, CouponKind::Percentage);

        input.value = "100.5".to_owned();
        assert!(input.validate().unwrap_err().get("value").is_some());

        input.value = "0".to_owned();
        assert!(input.validate().unwrap_err().get("value").is_some());
    }

    #[test]
    fn test_coupon_window_must_be_ordered() {
        let input = CouponInput {
            code: "WINDOW".to_owned(),
            kind: "fixed".to_owned(),
            value: "5".to_owned(),
            starts_at: "2025-05-02T10:00".to_owned(),
            expires_at: "2025-05-01T10:00".to_owned(),
            ..CouponInput::default()
        };
        assert_eq!(
            input.validate().unwrap_err().get("expires_at"),
            Some("Expiry must be after the start date")
        );
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password("longenough", "longenough").is_ok());
        let errors = validate_password("short", "other").unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_message_trimmed() {
        assert_eq!(validate_message("  hi there ").unwrap(), "hi there");
        assert!(validate_message("   ").is_err());
        assert!(validate_message(&"x".repeat(2001)).is_err());
    }

    #[test]
    fn test_question_and_answer_lengths() {
        assert!(validate_question("why?").is_err());
        assert!(validate_question("Is it dishwasher safe?").is_ok());
        assert!(validate_answer("Yes").is_ok());
        assert!(validate_answer("").is_err());
    }

    #[test]
    fn test_datetime_local() {
        let dt = parse_datetime_local("2025-05-01T09:30").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-05-01T09:30:00+00:00");
        assert!(parse_datetime_local("tomorrow").is_none());
    }

    #[test]
    fn test_live_stream_input() {
        let input = LiveStreamInput {
            title: "  Spring drop ".to_owned(),
            description: String::new(),
            scheduled_at: "2025-04-01T18:30".to_owned(),
        };
        let fields = input.validate().unwrap();
        assert_eq!(fields.title, "Spring drop");
        assert_eq!(fields.scheduled_at.to_rfc3339(), "2025-04-01T18:30:00+00:00");

        let bad = LiveStreamInput {
            title: "Hi".to_owned(),
            scheduled_at: "tomorrow".to_owned(),
            ..LiveStreamInput::default()
        };
        let errors = bad.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.get("scheduled_at").is_some());
    }

    #[test]
    fn test_settings_input() {
        let input = SettingsInput {
            commission_percent: "12.5".to_owned(),
            flat_shipping_rate: "$4.99".to_owned(),
            free_shipping_threshold: String::new(),
            announcement: "  Free returns this week ".to_owned(),
        };
        let fields = input.validate().unwrap();
        assert_eq!(fields.commission_percent, Decimal::new(125, 1));
        assert_eq!(fields.flat_shipping_rate, Decimal::new(499, 2));
        assert_eq!(fields.free_shipping_threshold, None);
        assert_eq!(fields.announcement.as_deref(), Some("Free returns this week"));

        let bad = SettingsInput {
            commission_percent: "150".to_owned(),
            flat_shipping_rate: "-1".to_owned(),
            free_shipping_threshold: "0".to_owned(),
            announcement: String::new(),
        };
        assert_eq!(bad.validate().unwrap_err().len(), 3);
    }
}
