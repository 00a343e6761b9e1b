//! Account pages: profile, password, email verification, identity
//! verification, and the application to become a seller.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use livestall_core::UserRole;
use livestall_core::otp::OtpPurpose;
use livestall_core::validation::SellerApplicationInput;

use crate::db::{IdentityRepository, RepositoryError, SellerRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireAuth, flash_error, flash_success};
use crate::models::{IdentitySession, SellerApplication, User};
use crate::services::auth::{AuthError, AuthService};
use crate::services::identity::IdentityService;
use crate::services::otp::{OtpError, OtpService};
use crate::state::AppState;

use super::layout::PageContext;

#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountTemplate {
    pub page: PageContext,
    pub account: User,
    pub application: Option<SellerApplication>,
    pub identity: Option<IdentitySession>,
    /// A verification code was sent and the confirm form should show.
    pub awaiting_code: bool,
}

impl AccountTemplate {
    /// Customers without an application under review may apply.
    #[must_use]
    pub fn can_apply(&self) -> bool {
        self.account.role == UserRole::Customer
            && !self
                .application
                .as_ref()
                .is_some_and(|a| a.status == livestall_core::SellerApplicationStatus::Pending)
    }
}

#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct CodeForm {
    pub code: String,
}

mod account_keys {
    pub const VERIFY_PENDING: &str = "account_verify_pending";
}

#[instrument(skip(state, session, page, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let account = UserRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    let application = SellerRepository::new(state.pool())
        .latest_application(user.id)
        .await?;
    let identity = IdentityRepository::new(state.pool())
        .latest_for_user(user.id)
        .await?;
    let awaiting_code = session
        .get::<bool>(account_keys::VERIFY_PENDING)
        .await?
        .unwrap_or(false);

    Ok(AccountTemplate {
        page,
        account,
        application,
        identity,
        awaiting_code,
    })
}

#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<PasswordForm>,
) -> Result<Redirect> {
    match AuthService::new(state.pool())
        .change_password(user.id, &form.password, &form.password_confirm)
        .await
    {
        Ok(()) => flash_success(&session, "Password updated").await,
        Err(AuthError::Invalid(message)) => flash_error(&session, message).await,
        Err(e) => return Err(e.into()),
    }
    Ok(Redirect::to("/account"))
}

/// Email a code proving the user owns their address.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn send_verification(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Redirect> {
    OtpService::new(state.pool(), state.email())
        .send_code(user.email.as_str(), OtpPurpose::Verify)
        .await?;
    session.insert(account_keys::VERIFY_PENDING, true).await?;
    flash_success(&session, format!("We sent a code to {}", user.email)).await;
    Ok(Redirect::to("/account#email"))
}

#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn confirm_verification(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<CodeForm>,
) -> Result<Redirect> {
    match OtpService::new(state.pool(), state.email())
        .verify(user.email.as_str(), OtpPurpose::Verify, &form.code)
        .await
    {
        Ok(_) => {
            UserRepository::new(state.pool())
                .mark_email_verified(user.id)
                .await?;
            session.remove_value(account_keys::VERIFY_PENDING).await?;
            flash_success(&session, "Email verified").await;
        }
        Err(e @ (OtpError::Repository(_) | OtpError::Email(_))) => return Err(e.into()),
        Err(e) => flash_error(&session, e.to_string()).await,
    }
    Ok(Redirect::to("/account#email"))
}

/// Start identity verification and send the user to the provider.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn start_identity(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Redirect> {
    let session = IdentityService::new(state.pool(), &state.config().identity_provider_url)
        .start(user.id)
        .await?;
    Ok(Redirect::to(&session.hosted_url))
}

/// Apply to become a seller.
#[instrument(skip(state, session, user, input), fields(user_id = %user.id))]
pub async fn apply(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(input): Form<SellerApplicationInput>,
) -> Result<Redirect> {
    if user.role != UserRole::Customer {
        return Err(AppError::BadRequest("You can already sell".to_owned()));
    }

    let input = match input.validate() {
        Ok(input) => input,
        Err(errors) => {
            flash_error(&session, errors.to_string()).await;
            return Ok(Redirect::to("/account#sell"));
        }
    };

    match SellerRepository::new(state.pool())
        .submit_application(user.id, &input)
        .await
    {
        Ok(id) => {
            tracing::info!(application_id = %id, "Seller application submitted");
            flash_success(&session, "Application submitted. We will review it shortly").await;
        }
        Err(RepositoryError::Conflict(message)) => flash_error(&session, message).await,
        Err(e) => return Err(e.into()),
    }
    Ok(Redirect::to("/account#sell"))
}
