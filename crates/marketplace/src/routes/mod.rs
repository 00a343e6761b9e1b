//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//!
//! # Catalog
//! GET  /products               - Search and browse
//! GET  /products/{id}          - Product detail
//! POST /products/{id}/questions - Ask the seller a question
//! GET  /live                   - Live and upcoming streams
//! GET  /live/{id}              - Stream page with featured products
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (returns count badge, triggers cart-updated)
//! POST /cart/update            - Update quantity (returns cart_items fragment)
//! POST /cart/remove            - Remove item (returns cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment)
//! POST /cart/coupon            - Apply a coupon code
//! POST /cart/coupon/remove     - Drop the coupon
//!
//! # Checkout and orders (requires auth)
//! GET  /checkout               - Shipping address form
//! POST /checkout               - Place orders, one per seller
//! GET  /orders                 - Order history
//! GET  /orders/{id}            - Order detail with timeline
//! POST /orders/{id}/cancel     - Cancel before shipment
//!
//! # Messages (requires auth)
//! GET  /messages               - Inbox
//! POST /messages/start         - Open a conversation with a seller
//! GET  /messages/{id}          - Conversation
//! POST /messages/{id}          - Send a message
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action
//! GET  /auth/otp               - Request a sign-in code
//! POST /auth/otp               - Email the code
//! GET  /auth/otp/verify        - Code entry page
//! POST /auth/otp/verify        - Sign in with the code
//! POST /auth/logout            - Logout action
//! POST /auth/stop-impersonating - Return to the admin identity
//!
//! # Account (requires auth)
//! GET  /account                - Profile, verification, seller application
//! POST /account/password       - Change password
//! POST /account/verify/send    - Email a verification code
//! POST /account/verify         - Confirm the code
//! POST /account/identity       - Start identity verification
//! POST /account/apply          - Apply to sell
//! GET  /identity/hosted/{ref}  - Stub hosted verification page
//!
//! # Seller center (requires seller)
//! /seller/...                  - See `seller::router`
//!
//! # Back-office (requires admin)
//! /admin/...                   - See `admin::router`
//!
//! # JSON API
//! /api/...                     - See `api::router`
//! ```

pub mod account;
pub mod admin;
pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod coupons;
pub mod home;
pub mod identity;
pub mod layout;
pub mod live;
pub mod messages;
pub mod orders;
pub mod products;
pub mod seller;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Redirect to a user-supplied local path, or to `fallback`.
///
/// Only same-site absolute paths are followed, so a form cannot bounce the
/// user to another host.
#[must_use]
pub fn safe_redirect(target: Option<&str>, fallback: &str) -> Redirect {
    match target {
        Some(path) if is_local_path(path) => Redirect::to(path),
        _ => Redirect::to(fallback),
    }
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}

/// Create the auth routes router.
///
/// Credential and code submissions are rate limited per client IP.
pub fn auth_routes() -> Router<AppState> {
    let limiter = auth_rate_limiter();
    Router::new()
        .route("/login", get(auth::login_page))
        .route("/login", post(auth::login).layer(limiter.clone()))
        .route("/register", get(auth::register_page))
        .route("/register", post(auth::register).layer(limiter.clone()))
        .route("/otp", get(auth::otp_page))
        .route("/otp", post(auth::otp_request).layer(limiter.clone()))
        .route("/otp/verify", get(auth::otp_verify_page))
        .route("/otp/verify", post(auth::otp_verify).layer(limiter))
        .route("/logout", post(auth::logout))
        .route(
            "/stop-impersonating",
            post(admin::users::stop_impersonating),
        )
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/{id}/questions", post(products::ask))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
        .route("/coupon", post(cart::apply_coupon))
        .route("/coupon/remove", post(cart::remove_coupon))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create the messaging routes router.
pub fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(messages::index))
        .route("/start", post(messages::start))
        .route("/{id}", get(messages::show).post(messages::send))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    let limiter = auth_rate_limiter();
    Router::new()
        .route("/", get(account::index))
        .route("/password", post(account::change_password).layer(limiter.clone()))
        .route("/verify/send", post(account::send_verification).layer(limiter.clone()))
        .route("/verify", post(account::confirm_verification).layer(limiter))
        .route("/identity", post(account::start_identity))
        .route("/apply", post(account::apply))
}

/// Create all routes for the marketplace.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Catalog
        .nest("/products", product_routes())
        .route("/live", get(live::index))
        .route("/live/{id}", get(live::show))
        // Cart and checkout
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::place))
        .nest("/orders", order_routes())
        // Messaging
        .nest("/messages", message_routes())
        // Auth and account
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .route("/identity/hosted/{reference}", get(identity::hosted))
        // Seller center and back-office
        .nest("/seller", seller::router())
        .nest("/admin", admin::router())
        // JSON API
        .nest("/api", api::router().layer(api_rate_limiter()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_paths_only() {
        assert!(is_local_path("/seller/questions"));
        assert!(is_local_path("/products/4#questions"));
        assert!(!is_local_path("//evil.example.com"));
        assert!(!is_local_path("https://evil.example.com"));
        assert!(!is_local_path("/\\evil.example.com"));
        assert!(!is_local_path(""));
    }
}
