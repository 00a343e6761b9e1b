//! Authentication middleware and extractors.
//!
//! Extractors read the [`CurrentUser`] stored in the session. Pages redirect
//! anonymous visitors to the login page, `/api/` paths answer `401`, and a
//! signed-in user without the required role gets `403`.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::session::keys;
use crate::models::{CurrentUser, Impersonator};

/// Extractor that requires a signed-in user.
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a seller (admins pass too).
pub struct RequireSeller(pub CurrentUser);

/// Extractor that requires an admin.
pub struct RequireAdmin(pub CurrentUser);

/// Error returned when a request lacks the required identity.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// Signed in, but not allowed here.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => (StatusCode::FORBIDDEN, "You do not have access to this page")
                .into_response(),
        }
    }
}

async fn current_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

async fn require_user(parts: &Parts) -> Result<CurrentUser, AuthRejection> {
    current_user(parts).await.ok_or_else(|| {
        if parts.uri.path().starts_with("/api/") {
            AuthRejection::Unauthorized
        } else {
            AuthRejection::RedirectToLogin
        }
    })
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_user(parts).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireSeller
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = require_user(parts).await?;
        if user.is_seller() {
            Ok(Self(user))
        } else {
            Err(AuthRejection::Forbidden)
        }
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = require_user(parts).await?;
        if user.is_admin() {
            Ok(Self(user))
        } else {
            Err(AuthRejection::Forbidden)
        }
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject anonymous requests.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts).await))
    }
}

/// Store the signed-in user.
///
/// The session ID is cycled to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_USER, user).await
}

/// Sign out: drop everything in the session, cart included.
///
/// # Errors
///
/// Returns an error if the session cannot be flushed.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

/// Why impersonation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ImpersonationError {
    #[error("admins cannot impersonate other admins")]
    TargetIsAdmin,
    #[error("you are already impersonating someone")]
    AlreadyImpersonating,
    #[error("you cannot impersonate yourself")]
    SelfTarget,
}

/// Build the session identity for an admin acting as `target`.
///
/// # Errors
///
/// Returns [`ImpersonationError`] when the switch is not allowed.
pub fn impersonate(admin: &CurrentUser, target: CurrentUser) -> Result<CurrentUser, ImpersonationError> {
    if admin.is_impersonating() {
        return Err(ImpersonationError::AlreadyImpersonating);
    }
    if admin.id == target.id {
        return Err(ImpersonationError::SelfTarget);
    }
    if target.is_admin() {
        return Err(ImpersonationError::TargetIsAdmin);
    }
    Ok(CurrentUser {
        impersonator: Some(Impersonator {
            id: admin.id,
            email: admin.email.clone(),
            display_name: admin.display_name.clone(),
        }),
        ..target
    })
}

/// Store an identity built by [`impersonate`]. The cart is dropped.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn start_impersonation(
    session: &Session,
    acting: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.remove_value(keys::CART).await?;
    session.insert(keys::CURRENT_USER, acting).await
}

/// Restore the admin identity behind an impersonated session.
///
/// Returns the admin's ID, or `None` if the session was not impersonating.
/// The caller reloads the admin from the database and stores them with
/// [`set_current_user`].
#[must_use]
pub fn impersonator_of(user: &CurrentUser) -> Option<livestall_core::UserId> {
    user.impersonator.as_ref().map(|i| i.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use livestall_core::{Email, UserId, UserRole};

    use super::*;

    fn user(id: i32, role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse(&format!("user{id}@example.com")).unwrap(),
            display_name: format!("User {id}"),
            role,
            impersonator: None,
        }
    }

    #[test]
    fn test_impersonate_keeps_admin_identity() {
        let admin = user(1, UserRole::Admin);
        let acting = impersonate(&admin, user(2, UserRole::Seller)).unwrap();
        assert_eq!(acting.id, UserId::new(2));
        assert_eq!(acting.role, UserRole::Seller);
        assert!(acting.is_impersonating());
        assert_eq!(impersonator_of(&acting), Some(UserId::new(1)));
    }

    #[test]
    fn test_cannot_impersonate_admin() {
        let admin = user(1, UserRole::Admin);
        assert_eq!(
            impersonate(&admin, user(3, UserRole::Admin)),
            Err(ImpersonationError::TargetIsAdmin)
        );
    }

    #[test]
    fn test_cannot_nest_or_self_impersonate() {
        let admin = user(1, UserRole::Admin);
        assert_eq!(
            impersonate(&admin, user(1, UserRole::Customer)),
            Err(ImpersonationError::SelfTarget)
        );
        let acting = impersonate(&admin, user(2, UserRole::Customer)).unwrap();
        assert_eq!(
            impersonate(&acting, user(4, UserRole::Customer)),
            Err(ImpersonationError::AlreadyImpersonating)
        );
    }

    #[test]
    fn test_plain_session_has_no_impersonator() {
        assert_eq!(impersonator_of(&user(5, UserRole::Customer)), None);
    }
}
