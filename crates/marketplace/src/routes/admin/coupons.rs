//! Platform-wide coupons. They discount any seller's items.

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
use crate::middleware::RequireAdmin;
use crate::routes::coupons::{self as shared, CouponScope, ToggleForm};
use crate::routes::layout::PageContext;
use crate::state::AppState;

#[instrument(skip(state, page, admin), fields(user_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Response> {
    shared::list(&state, page, CouponScope::platform(), CouponInput::default()).await
}

#[instrument(skip(state, session, page, admin, input), fields(user_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Form(input): Form<CouponInput>,
) -> Result<Response> {
    shared::create(&state, &session, page, CouponScope::platform(), input).await
}

#[instrument(skip(state, session, admin), fields(user_id = %admin.id))]
pub async fn toggle(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
    Form(form): Form<ToggleForm>,
) -> Result<Redirect> {
    shared::set_active(
        &state,
        &session,
        CouponScope::platform(),
        CouponId::new(id),
        form.active,
    )
    .await
}

#[instrument(skip(state, session, admin), fields(user_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    shared::delete(&state, &session, CouponScope::platform(), CouponId::new(id)).await
}
