//! JSON endpoints.
//!
//! Errors come back as `{"error": "..."}` with the status of the
//! underlying [`AppError`].

pub mod counters;
pub mod email;
pub mod identity;
pub mod otp;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;

use crate::db::RepositoryError;
use crate::error::AppError;
use crate::services::email::EmailError;
use crate::services::otp::OtpError;
use crate::state::AppState;

/// Error body for API endpoints.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
}

impl ApiError {
    fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            error: msg.into(),
        }
    }

    fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status = err.status();
        if status.is_server_error() {
            let event_id = sentry::capture_error(&err);
            tracing::error!(error = %err, sentry_event_id = %event_id, "API error");
        }
        Self::new(status, err.public_message())
    }
}

macro_rules! via_app_error {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for ApiError {
                fn from(err: $source) -> Self {
                    AppError::from(err).into()
                }
            }
        )*
    };
}

via_app_error!(RepositoryError, OtpError, EmailError, tower_sessions::session::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Build the API router (mounted at `/api`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/otp/send", post(otp::send))
        .route("/otp/verify", post(otp::verify))
        .route("/identity/sessions", post(identity::create))
        .route("/identity/sessions/{id}", get(identity::show))
        .route("/identity/sessions/{id}/complete", post(identity::complete))
        .route("/email/send", post(email::send))
        .route("/counters/{kind}/next", post(counters::next))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_keeps_status_and_hides_internals() {
        let not_found = ApiError::from(RepositoryError::NotFound);
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert_eq!(not_found.error, "Not found");

        let internal = ApiError::from(AppError::Internal("pool exhausted".to_owned()));
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.error, "Internal server error");
    }
}
