//! One-shot messages carried across a redirect.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::models::session::keys;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.kind, FlashKind::Error)
    }
}

/// Queue a message for the next page. Session failures are only logged.
pub async fn set_flash(session: &Session, kind: FlashKind, message: impl Into<String>) {
    let flash = Flash {
        kind,
        message: message.into(),
    };
    if let Err(e) = session.insert(keys::FLASH, flash).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
}

pub async fn flash_success(session: &Session, message: impl Into<String>) {
    set_flash(session, FlashKind::Success, message).await;
}

pub async fn flash_error(session: &Session, message: impl Into<String>) {
    set_flash(session, FlashKind::Error, message).await;
}

/// Extractor that takes (and clears) the pending flash message.
pub struct TakeFlash(pub Option<Flash>);

impl<S> FromRequestParts<S> for TakeFlash
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let flash = match parts.extensions.get::<Session>() {
            Some(session) => session.remove::<Flash>(keys::FLASH).await.ok().flatten(),
            None => None,
        };
        Ok(Self(flash))
    }
}
