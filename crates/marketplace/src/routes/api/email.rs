//! Admin-only transactional email.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::middleware::RequireAdmin;
use crate::state::AppState;

use super::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendEmailResponse {
    pub sent: bool,
    /// `false` when SMTP is not configured and the message was only logged.
    pub delivered: bool,
}

#[instrument(skip(state, admin, body), fields(user_id = %admin.id, to = %body.to))]
pub async fn send(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<SendEmailRequest>,
) -> ApiResult<SendEmailResponse> {
    if body.subject.trim().is_empty() || body.text.trim().is_empty() {
        return Err(ApiError::bad_request("subject and text are required"));
    }

    state
        .email()
        .send(&body.to, body.subject.trim(), &body.text, body.html.as_deref())
        .await?;

    tracing::info!("Transactional email sent");
    Ok(Json(SendEmailResponse {
        sent: true,
        delivered: state.email().is_delivering(),
    }))
}
