//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;
use std::str::FromStr;

use rust_decimal::Decimal;

use livestall_core::Price;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats a decimal amount as dollars.
///
/// Usage in templates: `{{ order.total|money }}` renders `$12.50`.
#[askama::filter_fn]
pub fn money(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    Ok(Decimal::from_str(&raw).map_or(raw, |amount| Price::usd(amount).display()))
}

/// Formats a decimal for an `<input type="number">` (two places, no symbol).
///
/// Usage in templates: `{{ product.price|plain_amount }}`
#[askama::filter_fn]
pub fn plain_amount(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    Ok(Decimal::from_str(&raw).map_or(raw, |amount| {
        format!("{:.2}", livestall_core::round_money(amount))
    }))
}

/// Replaces underscores with spaces so enum values read as words.
///
/// Usage in templates: `{{ stage|humanize }}` renders `out for delivery`.
#[askama::filter_fn]
pub fn humanize(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(value.to_string().replace('_', " "))
}
