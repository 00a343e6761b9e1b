//! Identity verification sessions.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use livestall_core::IdentityStatus;

use crate::error::AppError;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::IdentitySession;
use crate::services::identity::IdentityService;
use crate::state::AppState;

use super::ApiResult;

fn service(state: &AppState) -> IdentityService<'_> {
    IdentityService::new(state.pool(), &state.config().identity_provider_url)
}

/// Start a session for the signed-in user.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> ApiResult<IdentitySession> {
    let session = service(&state).start(user.id).await?;
    Ok(Json(session))
}

/// Session status. Only its owner or an admin may look.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(reference): Path<Uuid>,
) -> ApiResult<IdentitySession> {
    let session = service(&state).get(reference).await?;
    if session.user_id != user.id && !user.is_admin() {
        return Err(AppError::NotFound("identity session".to_owned()).into());
    }
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub status: IdentityStatus,
}

/// Record the provider's verdict. Stands in for the provider webhook.
#[instrument(skip(state, admin, body), fields(user_id = %admin.id))]
pub async fn complete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(reference): Path<Uuid>,
    Json(body): Json<CompleteRequest>,
) -> ApiResult<IdentitySession> {
    let session = service(&state).complete(reference, body.status).await?;
    Ok(Json(session))
}
