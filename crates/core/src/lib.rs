//! Livestall Core - Shared types and marketplace rules.
//!
//! This crate provides the types and pure business rules used across all
//! Livestall components:
//! - `livestall-web` - Storefront, seller center, and admin back-office
//! - `livestall-cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything here can be unit tested without a
//! running server.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//! - [`cart`] - Session-persisted shopping cart
//! - [`coupon`] - Coupon eligibility and discount calculation
//! - [`checkout`] - Per-seller order split and totals
//! - [`timeline`] - Order timeline and status derivation
//! - [`otp`] - One-time passcode generation and hashing
//! - [`public_id`] - Human-facing sequential identifiers
//! - [`validation`] - Form validation rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod coupon;
pub mod otp;
pub mod public_id;
pub mod timeline;
pub mod types;
pub mod validation;

pub use types::*;
