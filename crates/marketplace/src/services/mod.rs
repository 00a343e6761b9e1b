//! Business logic services for the marketplace.
//!
//! # Services
//!
//! - `auth` - Email/password accounts (Argon2id)
//! - `otp` - One-time passcode sign-in and verification
//! - `email` - Transactional email via SMTP (or the log)
//! - `checkout` - Repricing, coupon checks, per-seller order split
//! - `catalog` - Cached product pages
//! - `media` - Uploaded images on disk
//! - `identity` - Stub identity verification provider

pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod email;
pub mod identity;
pub mod media;
pub mod otp;
