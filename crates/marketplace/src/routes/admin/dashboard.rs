//! Back-office overview.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use livestall_core::UserRole;

use crate::db::{OrderRepository, PayoutRepository, ProductRepository, SellerRepository, UserRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::layout::PageContext;
use crate::state::AppState;

/// Counts shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformCounts {
    pub users: i64,
    pub sellers: i64,
    pub products: i64,
    pub orders: i64,
    pub pending_applications: i64,
    pub requested_payouts: i64,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct AdminDashboardTemplate {
    pub page: PageContext,
    pub counts: PlatformCounts,
}

#[instrument(skip(state, page, admin), fields(user_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RequireAdmin(admin): RequireAdmin,
) -> Result<impl IntoResponse> {
    let pool = state.pool();
    let users = UserRepository::new(pool);
    let product_repo = ProductRepository::new(pool);
    let order_repo = OrderRepository::new(pool);
    let seller_repo = SellerRepository::new(pool);
    let payout_repo = PayoutRepository::new(pool);

    let (all_users, sellers, products, orders, pending_applications, requested_payouts) = tokio::try_join!(
        users.count(None),
        users.count(Some(UserRole::Seller)),
        product_repo.count(None),
        order_repo.count(),
        seller_repo.count_pending(),
        payout_repo.count_requested(),
    )?;

    Ok(AdminDashboardTemplate {
        page,
        counts: PlatformCounts {
            users: all_users,
            sellers,
            products,
            orders,
            pending_applications,
            requested_payouts,
        },
    })
}
