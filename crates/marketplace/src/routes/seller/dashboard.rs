//! Seller dashboard.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
};
use tracing::instrument;

use crate::db::{OrderRepository, PayoutRepository, ProductRepository, SellerRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireSeller;
use crate::models::{SellerDashboard, SellerProfile};
use crate::routes::layout::PageContext;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "seller/dashboard.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub profile: Option<SellerProfile>,
    pub stats: SellerDashboard,
    pub show_welcome: bool,
}

#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RequireSeller(user): RequireSeller,
) -> Result<impl IntoResponse> {
    let settings = state.platform_settings().await?;
    let profile = SellerRepository::new(state.pool()).profile(user.id).await?;
    let sales = OrderRepository::new(state.pool())
        .seller_sales(user.id)
        .await?;
    let payouts = PayoutRepository::new(state.pool());

    let stats = SellerDashboard {
        product_count: ProductRepository::new(state.pool())
            .count(Some(user.id))
            .await?,
        open_orders: sales.open_orders,
        gross_sales: sales.gross_sales,
        pending_payouts: payouts.pending_total(user.id).await?,
        available_balance: payouts
            .available_balance(user.id, settings.commission_percent)
            .await?,
    };

    Ok(DashboardTemplate {
        page,
        show_welcome: profile.as_ref().is_some_and(|p| !p.welcome_seen),
        profile,
        stats,
    })
}

/// Remember that the seller has seen the welcome dialog.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn dismiss_welcome(
    State(state): State<AppState>,
    RequireSeller(user): RequireSeller,
) -> Result<Redirect> {
    SellerRepository::new(state.pool())
        .mark_welcome_seen(user.id)
        .await?;
    Ok(Redirect::to("/seller"))
}
