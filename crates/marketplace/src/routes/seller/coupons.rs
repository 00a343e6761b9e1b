//! The seller's own coupons. They only discount this seller's items.

use axum::{
    Form,
    extract::{Path, State},
    response::{Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use livestall_core::CouponId;
use livestall_core::validation::CouponInput;

use crate::error::Result;
use crate::middleware::RequireSeller;
use crate::routes::coupons::{self as shared, CouponScope, ToggleForm};
use crate::routes::layout::PageContext;
use crate::state::AppState;

#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RequireSeller(user): RequireSeller,
) -> Result<Response> {
    shared::list(&state, page, CouponScope::seller(user.id), CouponInput::default()).await
}

#[instrument(skip(state, session, page, user, input), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireSeller(user): RequireSeller,
    Form(input): Form<CouponInput>,
) -> Result<Response> {
    shared::create(&state, &session, page, CouponScope::seller(user.id), input).await
}

#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn toggle(
    State(state): State<AppState>,
    session: Session,
    RequireSeller(user): RequireSeller,
    Path(id): Path<i32>,
    Form(form): Form<ToggleForm>,
) -> Result<Redirect> {
    shared::set_active(
        &state,
        &session,
        CouponScope::seller(user.id),
        CouponId::new(id),
        form.active,
    )
    .await
}

#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireSeller(user): RequireSeller,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    shared::delete(&state, &session, CouponScope::seller(user.id), CouponId::new(id)).await
}
