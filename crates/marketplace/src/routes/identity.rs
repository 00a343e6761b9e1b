//! Hosted identity verification page of the stub provider.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::IdentitySession;
use crate::services::identity::IdentityService;
use crate::state::AppState;

use super::layout::PageContext;

#[derive(Template, WebTemplate)]
#[template(path = "identity/hosted.html")]
pub struct HostedTemplate {
    pub page: PageContext,
    pub session: IdentitySession,
}

/// Shows the session's status to the user who started it.
#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn hosted(
    State(state): State<AppState>,
    page: PageContext,
    RequireAuth(user): RequireAuth,
    Path(reference): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let session = IdentityService::new(state.pool(), &state.config().identity_provider_url)
        .get(reference)
        .await?;
    if session.user_id != user.id && !user.is_admin() {
        return Err(AppError::NotFound("verification session".to_owned()));
    }
    Ok(HostedTemplate { page, session })
}
