//! Counters behind human-facing public IDs (`ORD-000042`).
//!
//! Takes any executor so IDs can be assigned inside the transaction that
//! creates the row they label.

use livestall_core::public_id::{self, PublicIdKind};

use super::RepositoryError;

/// Increment the counter for `kind` and return the new value.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn next_value<'e, E>(executor: E, kind: PublicIdKind) -> Result<u64, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let value = sqlx::query_scalar::<_, i64>(
        "INSERT INTO marketplace.public_id_counter (kind, value) VALUES ($1, 1) \
         ON CONFLICT (kind) DO UPDATE SET value = public_id_counter.value + 1 \
         RETURNING value",
    )
    .bind(kind.as_str())
    .fetch_one(executor)
    .await?;

    u64::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {kind:?} counter: {value}")))
}

/// Assign the next public ID for `kind`, e.g. `"ORD-000042"`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn next_public_id<'e, E>(executor: E, kind: PublicIdKind) -> Result<String, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let value = next_value(executor, kind).await?;
    Ok(public_id::format(kind, value))
}
