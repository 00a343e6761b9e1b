//! Data every full page needs for the shared layout.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use livestall_core::cart::Cart;

use crate::middleware::CspNonce;
use crate::middleware::flash::Flash;
use crate::models::CurrentUser;
use crate::models::session::keys;
use crate::state::AppState;

/// Layout context: who is signed in, the cart badge, the pending flash
/// message, the CSP nonce, and the announcement banner.
///
/// ```rust,ignore
/// async fn page(page: PageContext) -> impl IntoResponse {
///     SomeTemplate { page }
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub cart_count: u32,
    pub flash: Option<Flash>,
    pub nonce: String,
    pub announcement: Option<String>,
}

impl PageContext {
    #[must_use]
    pub fn is_seller(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_seller)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_admin)
    }

    #[must_use]
    pub fn impersonator_name(&self) -> Option<&str> {
        self.user
            .as_ref()
            .and_then(|u| u.impersonator.as_ref())
            .map(|i| i.display_name.as_str())
    }

    /// Replace the flash with an inline message (for re-rendered forms).
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.flash = Some(Flash {
            kind: crate::middleware::FlashKind::Error,
            message: message.into(),
        });
        self
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let nonce = parts
            .extensions
            .get::<CspNonce>()
            .map(|n| n.value().to_owned())
            .unwrap_or_default();

        let mut page = Self {
            nonce,
            ..Self::default()
        };

        if let Some(session) = parts.extensions.get::<Session>() {
            page.user = session
                .get::<CurrentUser>(keys::CURRENT_USER)
                .await
                .ok()
                .flatten();
            page.cart_count = session
                .get::<Cart>(keys::CART)
                .await
                .ok()
                .flatten()
                .map_or(0, |cart| cart.item_count());
            page.flash = session.remove::<Flash>(keys::FLASH).await.ok().flatten();
        }

        match state.platform_settings().await {
            Ok(settings) => {
                page.announcement = settings.announcement.filter(|a| !a.trim().is_empty());
            }
            Err(e) => tracing::warn!(error = %e, "Could not load platform settings for layout"),
        }

        Ok(page)
    }
}
