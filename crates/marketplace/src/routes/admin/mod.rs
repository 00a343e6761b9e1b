//! Admin back-office.
//!
//! Every page requires [`RequireAdmin`](crate::middleware::RequireAdmin).
//! While impersonating, the session carries the target's identity, so these
//! pages are closed until the admin stops impersonating.

pub mod applications;
pub mod coupons;
pub mod dashboard;
pub mod moderation;
pub mod orders;
pub mod payouts;
pub mod settings;
pub mod users;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Build the back-office router (mounted at `/admin`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        // Users
        .route("/users", get(users::index))
        .route("/users/{id}/status", post(users::set_status))
        .route("/users/{id}/role", post(users::set_role))
        .route("/users/{id}/impersonate", post(users::impersonate))
        // Seller applications
        .route("/applications", get(applications::index))
        .route("/applications/{id}/approve", post(applications::approve))
        .route("/applications/{id}/reject", post(applications::reject))
        // Moderation
        .route("/moderation", get(moderation::index))
        .route("/moderation/products/{id}/hide", post(moderation::hide_product))
        .route(
            "/moderation/products/{id}/restore",
            post(moderation::restore_product),
        )
        .route(
            "/moderation/questions/{id}/delete",
            post(moderation::delete_question),
        )
        // Platform coupons
        .route("/coupons", get(coupons::index).post(coupons::create))
        .route("/coupons/{id}/toggle", post(coupons::toggle))
        .route("/coupons/{id}/delete", post(coupons::delete))
        // Orders
        .route("/orders", get(orders::index))
        // Payouts
        .route("/payouts", get(payouts::index))
        .route("/payouts/{id}/transition", post(payouts::transition))
        // Settings
        .route("/settings", get(settings::show).post(settings::update))
}
