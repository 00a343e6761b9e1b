//! Database migration command.
//!
//! Applies the SQL files in `crates/marketplace/migrations/` that have not
//! run yet. Safe to repeat.
//!
//! # Environment Variables
//!
//! - `LIVESTALL_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use thiserror::Error;

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    livestall_web::db::run_migrations(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
