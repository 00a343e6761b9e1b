//! Database operations for the marketplace `PostgreSQL` database.
//!
//! All tables live in the `marketplace` schema; sessions use the
//! `tower_sessions` schema.
//!
//! ## Tables
//!
//! - `user`, `user_password` - Accounts and Argon2 password hashes
//! - `seller_application`, `seller_profile` - Seller onboarding and stores
//! - `product`, `product_image`, `product_question` - Catalog and Q&A
//! - `coupon` - Platform and seller discount codes
//! - `order`, `order_item` - Per-seller orders with a JSONB timeline
//! - `conversation`, `message` - Buyer-seller messaging
//! - `payout` - Seller payout requests
//! - `live_stream`, `live_stream_product` - Live selling sessions
//! - `otp_code` - Hashed one-time passcodes
//! - `identity_session` - Identity verification attempts
//! - `public_id_counter` - Counters behind `ORD-`/`SEL-`/`PAY-` IDs
//! - `setting` - Platform settings (JSONB)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/marketplace/migrations/` and run via:
//! ```bash
//! cargo run -p livestall-cli -- migrate
//! ```

pub mod conversations;
pub mod counters;
pub mod coupons;
pub mod identity;
pub mod live_streams;
pub mod orders;
pub mod otp;
pub mod payouts;
pub mod products;
pub mod questions;
pub mod sellers;
pub mod settings;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use conversations::ConversationRepository;
pub use coupons::CouponRepository;
pub use identity::IdentityRepository;
pub use live_streams::{LiveStreamRepository, NewLiveStream};
pub use orders::OrderRepository;
pub use otp::OtpRepository;
pub use payouts::PayoutRepository;
pub use products::ProductRepository;
pub use questions::QuestionRepository;
pub use sellers::SellerRepository;
pub use settings::SettingsRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email) or a rule the write would break.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run the embedded migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
