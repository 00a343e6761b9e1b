//! One-time passcode issue and verification.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use livestall_core::otp::OtpPurpose;

use crate::db::UserRepository;
use crate::error::set_sentry_user;
use crate::middleware::{OptionalAuth, set_current_user};
use crate::models::CurrentUser;
use crate::services::otp::OtpService;
use crate::state::AppState;

use super::{ApiError, ApiResult};

const fn default_purpose() -> OtpPurpose {
    OtpPurpose::SignIn
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub email: String,
    #[serde(default = "default_purpose")]
    pub purpose: OtpPurpose,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub sent: bool,
    pub expires_in_minutes: i64,
}

/// Email a code. Answers the same whether or not the account exists.
#[instrument(skip(state, body), fields(purpose = body.purpose.as_str()))]
pub async fn send(
    State(state): State<AppState>,
    Json(body): Json<SendRequest>,
) -> ApiResult<SendResponse> {
    OtpService::new(state.pool(), state.email())
        .send_code(&body.email, body.purpose)
        .await?;
    Ok(Json(SendResponse {
        sent: true,
        expires_in_minutes: livestall_core::otp::CODE_TTL_MINUTES,
    }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
    #[serde(default = "default_purpose")]
    pub purpose: OtpPurpose,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub verified: bool,
    /// Set when a sign-in code started a session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<CurrentUser>,
}

/// Check a code.
///
/// A sign-in code signs the caller in. A verification code confirms the
/// signed-in user's own address.
#[instrument(skip(state, session, current, body), fields(purpose = body.purpose.as_str()))]
pub async fn verify(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(current): OptionalAuth,
    Json(body): Json<VerifyRequest>,
) -> ApiResult<VerifyResponse> {
    let otp = OtpService::new(state.pool(), state.email());

    match body.purpose {
        OtpPurpose::SignIn => {
            let user = otp.sign_in(&body.email, &body.code).await?;
            let current = CurrentUser::from(&user);
            set_current_user(&session, &current).await?;
            set_sentry_user(&user.id, Some(user.email.as_str()));
            tracing::info!(user_id = %user.id, "Signed in with code");
            Ok(Json(VerifyResponse {
                verified: true,
                user: Some(current),
            }))
        }
        OtpPurpose::Verify => {
            let Some(current) = current else {
                return Err(ApiError::new(
                    axum::http::StatusCode::UNAUTHORIZED,
                    "Sign in to verify your email",
                ));
            };
            let email = otp.verify(&body.email, OtpPurpose::Verify, &body.code).await?;
            if email != current.email {
                return Err(ApiError::bad_request("That code was sent to a different address"));
            }
            UserRepository::new(state.pool())
                .mark_email_verified(current.id)
                .await?;
            tracing::info!(user_id = %current.id, "Email verified");
            Ok(Json(VerifyResponse {
                verified: true,
                user: None,
            }))
        }
    }
}
