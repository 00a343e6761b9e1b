//! Coupon management shared by the seller center (own coupons) and the
//! admin back-office (platform-wide coupons).

use askama::Template;
use askama_web::WebTemplate;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use tower_sessions::Session;

use livestall_core::coupon::Coupon;
use livestall_core::validation::CouponInput;
use livestall_core::{CouponId, CouponKind, UserId};

use crate::db::{CouponRepository, RepositoryError};
use crate::error::Result;
use crate::filters;
use crate::middleware::{flash_error, flash_success};
use crate::state::AppState;

use super::layout::PageContext;

/// Whose coupons a page manages.
#[derive(Debug, Clone, Copy)]
pub struct CouponScope {
    /// `None` for platform coupons.
    pub owner: Option<UserId>,
    pub base_path: &'static str,
}

impl CouponScope {
    #[must_use]
    pub const fn seller(id: UserId) -> Self {
        Self {
            owner: Some(id),
            base_path: "/seller/coupons",
        }
    }

    #[must_use]
    pub const fn platform() -> Self {
        Self {
            owner: None,
            base_path: "/admin/coupons",
        }
    }
}

/// Enable/disable switch posted from the coupon list.
#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    pub active: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "coupons/index.html")]
pub struct CouponsTemplate {
    pub page: PageContext,
    pub coupons: Vec<Coupon>,
    pub input: CouponInput,
    pub base_path: &'static str,
    pub platform: bool,
    pub kinds: &'static [CouponKind],
}

pub async fn list(
    state: &AppState,
    page: PageContext,
    scope: CouponScope,
    input: CouponInput,
) -> Result<Response> {
    let coupons = CouponRepository::new(state.pool()).list(scope.owner).await?;
    Ok(CouponsTemplate {
        page,
        coupons,
        input,
        base_path: scope.base_path,
        platform: scope.owner.is_none(),
        kinds: CouponKind::ALL,
    }
    .into_response())
}

pub async fn create(
    state: &AppState,
    session: &Session,
    page: PageContext,
    scope: CouponScope,
    input: CouponInput,
) -> Result<Response> {
    let fields = match input.validate() {
        Ok(fields) => fields,
        Err(errors) => return list(state, page.with_error(errors.to_string()), scope, input).await,
    };

    match CouponRepository::new(state.pool())
        .create(scope.owner, &fields)
        .await
    {
        Ok(id) => {
            tracing::info!(coupon_id = %id, code = %fields.code, "Coupon created");
            flash_success(session, format!("Coupon {} created", fields.code)).await;
            Ok(Redirect::to(scope.base_path).into_response())
        }
        Err(RepositoryError::Conflict(message)) => {
            list(state, page.with_error(message), scope, input).await
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn set_active(
    state: &AppState,
    session: &Session,
    scope: CouponScope,
    id: CouponId,
    active: bool,
) -> Result<Redirect> {
    CouponRepository::new(state.pool())
        .set_active(id, scope.owner, active)
        .await?;
    flash_success(
        session,
        if active { "Coupon enabled" } else { "Coupon disabled" },
    )
    .await;
    Ok(Redirect::to(scope.base_path))
}

pub async fn delete(
    state: &AppState,
    session: &Session,
    scope: CouponScope,
    id: CouponId,
) -> Result<Redirect> {
    match CouponRepository::new(state.pool())
        .delete(id, scope.owner)
        .await
    {
        Ok(()) => flash_success(session, "Coupon deleted").await,
        Err(RepositoryError::Conflict(message)) => flash_error(session, message).await,
        Err(e) => return Err(e.into()),
    }
    Ok(Redirect::to(scope.base_path))
}
