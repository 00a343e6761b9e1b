//! Every order on the platform.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use livestall_core::OrderStage;

use crate::db::OrderRepository;
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Order;
use crate::routes::layout::PageContext;
use crate::state::AppState;

const PAGE_SIZE: i64 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    #[serde(default)]
    pub stage: String,
    pub page: Option<u32>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct AdminOrdersTemplate {
    pub page: PageContext,
    pub orders: Vec<Order>,
    pub stage: String,
    pub stages: &'static [OrderStage],
    pub current_page: u32,
    pub has_next: bool,
}

impl AdminOrdersTemplate {
    #[must_use]
    pub fn page_link(&self, page: u32) -> String {
        if self.stage.is_empty() {
            format!("/admin/orders?page={page}")
        } else {
            format!("/admin/orders?stage={}&page={page}", self.stage)
        }
    }
}

#[instrument(skip(state, page, admin), fields(user_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<OrderQuery>,
) -> Result<impl IntoResponse> {
    let stage = OrderStage::from_str(&query.stage).ok();
    let current_page = query.page.unwrap_or(1).max(1);
    let offset = i64::from(current_page - 1) * PAGE_SIZE;

    let mut orders = OrderRepository::new(state.pool())
        .list_all(stage, PAGE_SIZE + 1, offset)
        .await?;
    let limit = usize::try_from(PAGE_SIZE).unwrap_or(usize::MAX);
    let has_next = orders.len() > limit;
    orders.truncate(limit);

    Ok(AdminOrdersTemplate {
        page,
        orders,
        stage: stage.map(|s| s.as_str().to_owned()).unwrap_or_default(),
        stages: OrderStage::ALL,
        current_page,
        has_next,
    })
}
