//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use livestall_core::validation::ValidationErrors;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;
use crate::services::email::EmailError;
use crate::services::media::MediaError;
use crate::services::otp::OtpError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// One-time passcode operation failed.
    #[error("OTP error: {0}")]
    Otp(#[from] OtpError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Upload error: {0}")]
    Media(#[from] MediaError),

    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Submitted form failed validation.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but lacks the role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this is our fault rather than the client's.
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(RepositoryError::Database(_) | RepositoryError::DataCorruption(_))
                | Self::Auth(AuthError::Repository(_) | AuthError::PasswordHash)
                | Self::Otp(OtpError::Repository(_) | OtpError::Email(_))
                | Self::Checkout(CheckoutError::Repository(_))
                | Self::Media(MediaError::Io(_))
                | Self::Email(_)
                | Self::Session(_)
                | Self::Internal(_)
        )
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        if self.is_server_error() {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_)
            | Self::Checkout(CheckoutError::Unavailable(_) | CheckoutError::CartChanged(_)) => {
                StatusCode::CONFLICT
            }
            Self::Auth(AuthError::UserAlreadyExists) => StatusCode::CONFLICT,
            Self::Auth(AuthError::Suspended) | Self::Otp(OtpError::Suspended) | Self::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }
            Self::Auth(AuthError::InvalidCredentials | AuthError::UserNotFound)
            | Self::Otp(OtpError::WrongCode { .. } | OtpError::Expired | OtpError::UnknownAccount)
            | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Media(MediaError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Media(MediaError::UnsupportedType) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show to the client.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.is_server_error() {
            return "Internal server error".to_owned();
        }
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_owned(),
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::Auth(AuthError::InvalidCredentials | AuthError::UserNotFound) => {
                "Invalid email or password".to_owned()
            }
            Self::Auth(AuthError::UserAlreadyExists) => {
                "An account with this email already exists".to_owned()
            }
            Self::Auth(AuthError::Suspended) | Self::Otp(OtpError::Suspended) => {
                "This account has been suspended".to_owned()
            }
            Self::Auth(AuthError::InvalidEmail(_)) | Self::Otp(OtpError::InvalidEmail(_)) => {
                "Invalid email address".to_owned()
            }
            Self::Auth(err) => err.to_string(),
            Self::Otp(err) => err.to_string(),
            Self::Checkout(err) => err.to_string(),
            Self::Media(err) => err.to_string(),
            Self::Validation(errors) => errors.to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::Unauthorized(msg) | Self::Forbidden(msg) | Self::BadRequest(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added product", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use livestall_core::coupon::CouponError;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(get_status(AppError::NotFound("test".to_string())), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(get_status(AppError::Forbidden("test".to_string())), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_errors_map_by_kind() {
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Conflict("taken".into()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::DataCorruption("x".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Database(RepositoryError::DataCorruption("bad row 42".into()));
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_client_errors_keep_their_message() {
        let err = AppError::Checkout(CheckoutError::Coupon(CouponError::Expired));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "this coupon has expired");

        let err = AppError::Otp(OtpError::WrongCode { remaining: 2 });
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert!(err.public_message().contains("2 attempts left"));
    }

    #[test]
    fn test_changed_cart_lists_every_change() {
        let err = AppError::Checkout(CheckoutError::CartChanged(vec![
            "The price of Mug changed to $20.00".to_owned(),
            "Only 1 of Bowl left; quantity reduced".to_owned(),
        ]));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        let message = err.public_message();
        assert!(message.contains("Mug changed to $20.00; Only 1 of Bowl left"));
        assert!(message.contains("place the order again"));
    }
}
