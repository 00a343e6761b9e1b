//! Payout processing: approve, mark paid, or reject.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use livestall_core::{PayoutId, PayoutStatus};

use crate::db::{PayoutRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireAdmin, flash_error, flash_success};
use crate::models::Payout;
use crate::routes::layout::PageContext;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PayoutQuery {
    #[serde(default)]
    pub status: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/payouts.html")]
pub struct AdminPayoutsTemplate {
    pub page: PageContext,
    pub payouts: Vec<Payout>,
    pub status: String,
    pub statuses: &'static [PayoutStatus],
}

impl AdminPayoutsTemplate {
    /// Buttons to show for a payout.
    #[must_use]
    pub fn actions(&self, payout: &Payout) -> Vec<PayoutStatus> {
        PayoutStatus::ALL
            .iter()
            .copied()
            .filter(|next| payout.status.can_transition_to(*next))
            .collect()
    }
}

#[instrument(skip(state, page, admin), fields(user_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<PayoutQuery>,
) -> Result<impl IntoResponse> {
    let status = PayoutStatus::from_str(&query.status).ok();
    let payouts = PayoutRepository::new(state.pool()).list_all(status).await?;
    Ok(AdminPayoutsTemplate {
        page,
        payouts,
        status: status.map(|s| s.as_str().to_owned()).unwrap_or_default(),
        statuses: PayoutStatus::ALL,
    })
}

#[derive(Debug, Deserialize)]
pub struct TransitionForm {
    pub status: String,
    #[serde(default)]
    pub note: String,
}

#[instrument(skip(state, session, admin, form), fields(user_id = %admin.id))]
pub async fn transition(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
    Form(form): Form<TransitionForm>,
) -> Result<Redirect> {
    let next = PayoutStatus::from_str(&form.status).map_err(AppError::BadRequest)?;
    let note = Some(form.note.trim()).filter(|n| !n.is_empty());

    match PayoutRepository::new(state.pool())
        .transition(PayoutId::new(id), next, note)
        .await
    {
        Ok(()) => {
            tracing::info!(payout_id = id, status = %next, "Payout updated");
            flash_success(&session, format!("Payout marked {next}")).await;
        }
        Err(RepositoryError::Conflict(message)) => flash_error(&session, message).await,
        Err(e) => return Err(e.into()),
    }
    Ok(Redirect::to("/admin/payouts"))
}
