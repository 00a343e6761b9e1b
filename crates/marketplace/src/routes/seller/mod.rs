//! Seller center.
//!
//! Every handler here requires [`RequireSeller`](crate::middleware::RequireSeller);
//! admins pass too. Sellers only ever see and change their own records.

pub mod coupons;
pub mod dashboard;
pub mod live;
pub mod orders;
pub mod payouts;
pub mod products;
pub mod questions;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use livestall_core::{ProductId, UserId};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::models::Product;
use crate::state::AppState;

/// Build the seller center router (mounted at `/seller`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/welcome/dismiss", post(dashboard::dismiss_welcome))
        // Products
        .route("/products", get(products::index).post(products::create))
        .route("/products/new", get(products::new_form))
        .route(
            "/products/{id}",
            get(products::edit_form).post(products::update),
        )
        .route(
            "/products/{id}/images",
            post(products::upload_image).layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/products/{id}/images/{image_id}/delete",
            post(products::delete_image),
        )
        // Orders
        .route("/orders", get(orders::index))
        .route("/orders/{id}/advance", post(orders::advance))
        // Coupons
        .route("/coupons", get(coupons::index).post(coupons::create))
        .route("/coupons/{id}/toggle", post(coupons::toggle))
        .route("/coupons/{id}/delete", post(coupons::delete))
        // Questions
        .route("/questions", get(questions::index))
        .route("/questions/{id}/answer", post(questions::answer))
        // Payouts
        .route("/payouts", get(payouts::index).post(payouts::request))
        // Live streams
        .route("/live", get(live::index).post(live::create))
        .route("/live/{id}/start", post(live::start))
        .route("/live/{id}/end", post(live::end))
}

/// Load a product the seller owns.
pub(crate) async fn owned_product(state: &AppState, id: ProductId, seller: UserId) -> Result<Product> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .filter(|p| p.seller_id == seller)
        .ok_or_else(|| AppError::NotFound("product".to_owned()))
}
