//! Admin-only public ID assignment.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use livestall_core::public_id::PublicIdKind;

use crate::db::counters;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

use super::{ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct NextIdResponse {
    pub kind: PublicIdKind,
    pub public_id: String,
}

#[instrument(skip(state, admin), fields(user_id = %admin.id))]
pub async fn next(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(kind): Path<String>,
) -> ApiResult<NextIdResponse> {
    let kind = PublicIdKind::from_str(&kind).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let public_id = counters::next_public_id(state.pool(), kind).await?;
    tracing::info!(public_id = %public_id, "Public ID assigned");
    Ok(Json(NextIdResponse { kind, public_id }))
}
