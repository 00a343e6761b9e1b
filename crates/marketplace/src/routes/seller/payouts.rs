//! Seller payout requests.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use livestall_core::validation::parse_money;

use crate::db::{PayoutRepository, RepositoryError};
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireSeller, flash_error, flash_success};
use crate::models::Payout;
use crate::routes::layout::PageContext;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "seller/payouts.html")]
pub struct PayoutsTemplate {
    pub page: PageContext,
    pub payouts: Vec<Payout>,
    pub available: Decimal,
    pub commission_percent: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct PayoutForm {
    pub amount: String,
}

#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RequireSeller(user): RequireSeller,
) -> Result<impl IntoResponse> {
    let settings = state.platform_settings().await?;
    let repo = PayoutRepository::new(state.pool());
    let available = repo
        .available_balance(user.id, settings.commission_percent)
        .await?;
    let payouts = repo.list_for_seller(user.id).await?;

    Ok(PayoutsTemplate {
        page,
        payouts,
        available,
        commission_percent: settings.commission_percent,
    })
}

/// Request a payout of at most the available balance.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn request(
    State(state): State<AppState>,
    session: Session,
    RequireSeller(user): RequireSeller,
    Form(form): Form<PayoutForm>,
) -> Result<Redirect> {
    let Some(amount) = parse_money(&form.amount).filter(|a| *a > Decimal::ZERO) else {
        flash_error(&session, "Enter an amount greater than zero").await;
        return Ok(Redirect::to("/seller/payouts"));
    };

    let settings = state.platform_settings().await?;
    match PayoutRepository::new(state.pool())
        .request(user.id, amount, settings.commission_percent)
        .await
    {
        Ok(payout) => {
            tracing::info!(payout = %payout.public_id, amount = %amount, "Payout requested");
            flash_success(&session, format!("Payout {} requested", payout.public_id)).await;
        }
        Err(RepositoryError::Conflict(message)) => flash_error(&session, message).await,
        Err(e) => return Err(e.into()),
    }
    Ok(Redirect::to("/seller/payouts"))
}
