//! Seller application review.

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

use livestall_core::{SellerApplicationId, SellerApplicationStatus};

use crate::db::{RepositoryError, SellerRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireAdmin, flash_error, flash_success};
use crate::models::SellerApplication;
use crate::routes::layout::PageContext;
use crate::state::AppState;

const MAX_REASON_LENGTH: usize = 500;

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationQuery {
    /// Empty or missing shows pending ones; `all` shows every status.
    pub status: Option<String>,
}

impl ApplicationQuery {
    fn filter(&self) -> Option<SellerApplicationStatus> {
        match self.status.as_deref() {
            Some("all") => None,
            Some(raw) => SellerApplicationStatus::from_str(raw)
                .ok()
                .or(Some(SellerApplicationStatus::Pending)),
            None => Some(SellerApplicationStatus::Pending),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/applications.html")]
pub struct ApplicationsTemplate {
    pub page: PageContext,
    pub applications: Vec<SellerApplication>,
    /// `all` or a status name.
    pub status: String,
    pub statuses: &'static [SellerApplicationStatus],
}

#[instrument(skip(state, page, admin), fields(user_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<ApplicationQuery>,
) -> Result<impl IntoResponse> {
    let filter = query.filter();
    let applications = SellerRepository::new(state.pool())
        .list_applications(filter)
        .await?;

    Ok(ApplicationsTemplate {
        page,
        applications,
        status: filter.map_or_else(|| "all".to_owned(), |s| s.as_str().to_owned()),
        statuses: SellerApplicationStatus::ALL,
    })
}

#[instrument(skip(state, session, admin), fields(user_id = %admin.id))]
pub async fn approve(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    match SellerRepository::new(state.pool())
        .approve(SellerApplicationId::new(id), admin.id)
        .await
    {
        Ok(profile) => {
            tracing::info!(seller = %profile.public_id, applicant = %profile.user_id, "Seller approved");
            flash_success(
                &session,
                format!("{} approved as {}", profile.store_name, profile.public_id),
            )
            .await;
        }
        Err(RepositoryError::NotFound) => {
            flash_error(&session, "That application was already reviewed").await;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(Redirect::to("/admin/applications"))
}

#[derive(Debug, Deserialize)]
pub struct RejectForm {
    pub reason: String,
}

#[instrument(skip(state, session, admin, form), fields(user_id = %admin.id))]
pub async fn reject(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
    Form(form): Form<RejectForm>,
) -> Result<Redirect> {
    let reason = form.reason.trim();
    if reason.is_empty() || reason.chars().count() > MAX_REASON_LENGTH {
        flash_error(&session, "Give a reason of at most 500 characters").await;
        return Ok(Redirect::to("/admin/applications"));
    }

    match SellerRepository::new(state.pool())
        .reject(SellerApplicationId::new(id), admin.id, reason)
        .await
    {
        Ok(applicant) => {
            tracing::info!(applicant = %applicant, "Seller application rejected");
            flash_success(&session, "Application rejected").await;
        }
        Err(RepositoryError::NotFound) => {
            flash_error(&session, "That application was already reviewed").await;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(Redirect::to("/admin/applications"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_filter_defaults_to_pending() {
        let query = ApplicationQuery::default();
        assert_eq!(query.filter(), Some(SellerApplicationStatus::Pending));

        let all = ApplicationQuery {
            status: Some("all".to_owned()),
        };
        assert_eq!(all.filter(), None);

        let rejected = ApplicationQuery {
            status: Some("rejected".to_owned()),
        };
        assert_eq!(rejected.filter(), Some(SellerApplicationStatus::Rejected));
    }
}
