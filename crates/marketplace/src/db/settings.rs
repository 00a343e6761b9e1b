//! Key-value platform settings stored as JSONB.

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use sqlx::types::Json;

use super::RepositoryError;
use crate::models::PlatformSettings;

pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Read and deserialize a setting.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored JSON does not
    /// match `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RepositoryError> {
        let value = sqlx::query_scalar::<_, Json<serde_json::Value>>(
            "SELECT value FROM marketplace.setting WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(self.pool)
        .await?;

        value
            .map(|Json(v)| {
                serde_json::from_value(v)
                    .map_err(|e| RepositoryError::DataCorruption(format!("setting {key}: {e}")))
            })
            .transpose()
    }

    /// Store a setting, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn set<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO marketplace.setting (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(key)
        .bind(Json(value))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Platform settings, falling back to defaults when never saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the stored value cannot be read.
    pub async fn platform(&self) -> Result<PlatformSettings, RepositoryError> {
        Ok(self
            .get::<PlatformSettings>(PlatformSettings::KEY)
            .await?
            .unwrap_or_default())
    }

    /// Save platform settings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn save_platform(&self, settings: &PlatformSettings) -> Result<(), RepositoryError> {
        self.set(PlatformSettings::KEY, settings).await
    }
}
