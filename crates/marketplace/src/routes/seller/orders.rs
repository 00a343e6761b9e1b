//! Orders for the seller's store and moving them along the timeline.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use livestall_core::{OrderId, OrderStage};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireSeller, flash_error, flash_success};
use crate::models::Order;
use crate::routes::layout::PageContext;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "seller/orders.html")]
pub struct SellerOrdersTemplate {
    pub page: PageContext,
    pub orders: Vec<Order>,
    pub stage: String,
    pub stages: &'static [OrderStage],
}

#[derive(Debug, Deserialize)]
pub struct StageQuery {
    #[serde(default)]
    pub stage: String,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceForm {
    pub stage: String,
    #[serde(default)]
    pub tracking_number: String,
}

#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RequireSeller(user): RequireSeller,
    Query(query): Query<StageQuery>,
) -> Result<impl IntoResponse> {
    let stage = OrderStage::from_str(&query.stage).ok();
    let orders = OrderRepository::new(state.pool())
        .list_for_seller(user.id, stage)
        .await?;

    Ok(SellerOrdersTemplate {
        page,
        orders,
        stage: stage.map(|s| s.to_string()).unwrap_or_default(),
        stages: OrderStage::ALL,
    })
}

/// Advance an order to a later stage. Shipping needs a tracking number.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn advance(
    State(state): State<AppState>,
    session: Session,
    RequireSeller(user): RequireSeller,
    Path(id): Path<i32>,
    Form(form): Form<AdvanceForm>,
) -> Result<Redirect> {
    let orders = OrderRepository::new(state.pool());
    let order = orders
        .get(OrderId::new(id))
        .await?
        .filter(|o| o.seller_id == user.id || user.is_admin())
        .ok_or_else(|| AppError::NotFound("order".to_owned()))?;
    let back = format!("/orders/{}", order.id);

    let stage = OrderStage::from_str(&form.stage).map_err(AppError::BadRequest)?;
    let tracking = Some(form.tracking_number.trim()).filter(|t| !t.is_empty());
    if stage >= OrderStage::Shipped
        && stage != OrderStage::Cancelled
        && tracking.is_none()
        && order.tracking_number.is_none()
    {
        flash_error(&session, "Add a tracking number when the order ships").await;
        return Ok(Redirect::to(&back));
    }

    let mut timeline = order.timeline.clone();
    if let Err(e) = timeline.advance_to(stage, Utc::now()) {
        flash_error(&session, e.to_string()).await;
        return Ok(Redirect::to(&back));
    }

    orders
        .update_timeline(order.id, order.stage, &timeline, tracking)
        .await?;

    tracing::info!(order = %order.public_id, stage = %stage, "Order advanced");
    flash_success(
        &session,
        format!("Order {} is now {}", order.public_id, timeline.current_status()),
    )
    .await;
    Ok(Redirect::to(&back))
}
