//! Authentication route handlers.
//!
//! Password login and registration, one-time-code sign-in, and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use livestall_core::otp::OtpPurpose;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{clear_current_user, flash_success, set_current_user};
use crate::models::session::keys;
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthError, AuthService};
use crate::services::otp::{OtpError, OtpService};
use crate::state::AppState;

use super::layout::PageContext;

// =============================================================================
// Form Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpRequestForm {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpVerifyForm {
    pub code: String,
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub email: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub email: String,
    pub display_name: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/otp.html")]
pub struct OtpRequestTemplate {
    pub page: PageContext,
    pub email: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/otp_verify.html")]
pub struct OtpVerifyTemplate {
    pub page: PageContext,
    pub email: String,
}

async fn sign_in(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, role = %user.role, "Signed in");
    Ok(())
}

// =============================================================================
// Password Login
// =============================================================================

pub async fn login_page(page: PageContext) -> impl IntoResponse {
    LoginTemplate {
        page,
        email: String::new(),
    }
}

#[instrument(skip(state, session, page, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            sign_in(&session, &user).await?;
            flash_success(&session, format!("Welcome back, {}", user.display_name)).await;
            Ok(Redirect::to("/").into_response())
        }
        Err(e @ (AuthError::Repository(_) | AuthError::PasswordHash)) => Err(e.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            Ok(LoginTemplate {
                page: page.with_error(AppError::from(e).public_message()),
                email: form.email,
            }
            .into_response())
        }
    }
}

// =============================================================================
// Registration
// =============================================================================

pub async fn register_page(page: PageContext) -> impl IntoResponse {
    RegisterTemplate {
        page,
        email: String::new(),
        display_name: String::new(),
    }
}

#[instrument(skip(state, session, page, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    match AuthService::new(state.pool())
        .register(
            &form.email,
            &form.display_name,
            &form.password,
            &form.password_confirm,
        )
        .await
    {
        Ok(user) => {
            sign_in(&session, &user).await?;
            flash_success(&session, "Your account is ready").await;
            Ok(Redirect::to("/").into_response())
        }
        Err(e @ (AuthError::Repository(_) | AuthError::PasswordHash)) => Err(e.into()),
        Err(e) => Ok(RegisterTemplate {
            page: page.with_error(AppError::from(e).public_message()),
            email: form.email,
            display_name: form.display_name,
        }
        .into_response()),
    }
}

/// Sign out and drop the session, cart included.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}

// =============================================================================
// One-Time Code Sign-In
// =============================================================================

pub async fn otp_page(page: PageContext) -> impl IntoResponse {
    OtpRequestTemplate {
        page,
        email: String::new(),
    }
}

/// Email a sign-in code.
///
/// Answers the same way whether or not an account exists.
#[instrument(skip(state, session, page, form))]
pub async fn otp_request(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<OtpRequestForm>,
) -> Result<Response> {
    match OtpService::new(state.pool(), state.email())
        .send_code(&form.email, OtpPurpose::SignIn)
        .await
    {
        Ok(email) => {
            session.insert(keys::OTP_EMAIL, email.as_str()).await?;
            flash_success(&session, format!("If {email} has an account, a code is on its way")).await;
            Ok(Redirect::to("/auth/otp/verify").into_response())
        }
        Err(e @ OtpError::InvalidEmail(_)) => Ok(OtpRequestTemplate {
            page: page.with_error(AppError::from(e).public_message()),
            email: form.email,
        }
        .into_response()),
        Err(e) => Err(e.into()),
    }
}

pub async fn otp_verify_page(session: Session, page: PageContext) -> Result<Response> {
    let Some(email) = session.get::<String>(keys::OTP_EMAIL).await? else {
        return Ok(Redirect::to("/auth/otp").into_response());
    };
    Ok(OtpVerifyTemplate { page, email }.into_response())
}

/// Check the emailed code and sign in.
#[instrument(skip(state, session, page, form))]
pub async fn otp_verify(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<OtpVerifyForm>,
) -> Result<Response> {
    let Some(email) = session.get::<String>(keys::OTP_EMAIL).await? else {
        return Ok(Redirect::to("/auth/otp").into_response());
    };

    match OtpService::new(state.pool(), state.email())
        .sign_in(&email, &form.code)
        .await
    {
        Ok(user) => {
            session.remove_value(keys::OTP_EMAIL).await?;
            sign_in(&session, &user).await?;
            flash_success(&session, format!("Welcome, {}", user.display_name)).await;
            Ok(Redirect::to("/").into_response())
        }
        Err(e @ (OtpError::Repository(_) | OtpError::Email(_))) => Err(e.into()),
        Err(e) => {
            tracing::warn!(error = %e, "OTP sign-in failed");
            Ok(OtpVerifyTemplate {
                page: page.with_error(AppError::from(e).public_message()),
                email,
            }
            .into_response())
        }
    }
}
