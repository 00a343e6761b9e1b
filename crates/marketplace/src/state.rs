//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use sqlx::PgPool;

use crate::config::MarketplaceConfig;
use crate::db::{RepositoryError, SettingsRepository};
use crate::models::PlatformSettings;
use crate::services::catalog::CatalogCache;
use crate::services::email::{EmailError, EmailService};
use crate::services::media::MediaStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: MarketplaceConfig,
    pool: PgPool,
    email: EmailService,
    media: MediaStore,
    catalog: CatalogCache,
    settings: Cache<&'static str, PlatformSettings>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the email sender is misconfigured.
    pub fn new(config: MarketplaceConfig, pool: PgPool) -> Result<Self, EmailError> {
        let email = EmailService::new(&config.email)?;
        let media = MediaStore::new(&config.media);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
                media,
                catalog: CatalogCache::new(),
                settings: Cache::builder()
                    .max_capacity(1)
                    .time_to_live(Duration::from_secs(60))
                    .build(),
            }),
        })
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &MarketplaceConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    #[must_use]
    pub fn media(&self) -> &MediaStore {
        &self.inner.media
    }

    /// Cached product pages.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }

    /// Current platform settings, cached for a minute.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the settings row cannot be read.
    pub async fn platform_settings(&self) -> Result<PlatformSettings, RepositoryError> {
        if let Some(settings) = self.inner.settings.get(PlatformSettings::KEY).await {
            return Ok(settings);
        }
        let settings = SettingsRepository::new(self.pool()).platform().await?;
        self.inner
            .settings
            .insert(PlatformSettings::KEY, settings.clone())
            .await;
        Ok(settings)
    }

    /// Save platform settings and refresh the cached copy.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the settings cannot be written.
    pub async fn save_platform_settings(
        &self,
        settings: &PlatformSettings,
    ) -> Result<(), RepositoryError> {
        SettingsRepository::new(self.pool())
            .save_platform(settings)
            .await?;
        self.inner
            .settings
            .insert(PlatformSettings::KEY, settings.clone())
            .await;
        Ok(())
    }
}
