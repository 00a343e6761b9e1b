//! Buyer order history, order detail, and cancellation.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use chrono::Utc;
use tower_sessions::Session;
use tracing::instrument;

use livestall_core::OrderId;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireAuth, flash_error, flash_success};
use crate::models::{CurrentUser, Order, OrderItem};
use crate::state::AppState;

use super::layout::PageContext;

#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub page: PageContext,
    pub orders: Vec<Order>,
}

#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub page: PageContext,
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub is_buyer: bool,
}

/// Load an order the user may see: its buyer, its seller, or an admin.
pub(crate) async fn visible_order(
    state: &AppState,
    id: OrderId,
    user: &CurrentUser,
) -> Result<Order> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .filter(|o| o.buyer_id == user.id || o.seller_id == user.id || user.is_admin())
        .ok_or_else(|| AppError::NotFound("order".to_owned()))
}

/// The signed-in user's orders, newest first.
#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let orders = OrderRepository::new(state.pool())
        .list_for_buyer(user.id)
        .await?;
    Ok(OrdersTemplate { page, orders })
}

/// Order detail with its timeline.
#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let order = visible_order(&state, OrderId::new(id), &user).await?;
    let items = OrderRepository::new(state.pool()).items(order.id).await?;
    Ok(OrderShowTemplate {
        page,
        is_buyer: order.buyer_id == user.id,
        order,
        items,
    })
}

/// Cancel an order that has not shipped. Items go back in stock.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    let order = visible_order(&state, OrderId::new(id), &user).await?;
    if order.buyer_id != user.id {
        return Err(AppError::Forbidden("Only the buyer can cancel an order".to_owned()));
    }
    let back = format!("/orders/{}", order.id);

    let mut timeline = order.timeline.clone();
    if let Err(e) = timeline.cancel(Utc::now()) {
        flash_error(&session, e.to_string()).await;
        return Ok(Redirect::to(&back));
    }

    OrderRepository::new(state.pool())
        .cancel(order.id, order.stage, &timeline)
        .await?;

    tracing::info!(order = %order.public_id, "Order cancelled by buyer");
    flash_success(&session, format!("Order {} was cancelled", order.public_id)).await;
    Ok(Redirect::to(&back))
}
