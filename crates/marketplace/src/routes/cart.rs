//! Cart route handlers.
//!
//! The cart lives in the session. Add, update, and remove answer HTMX
//! requests with fragments and an `HX-Trigger: cart-updated` header so the
//! count badge refreshes itself.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use livestall_core::cart::{Cart, CartLine};
use livestall_core::coupon::normalize_code;
use livestall_core::ProductId;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{flash_error, flash_success};
use crate::models::session::keys;
use crate::services::checkout::{CheckoutService, CheckoutSummary};
use crate::state::AppState;

use super::layout::PageContext;

// =============================================================================
// Session Helpers
// =============================================================================

/// The session cart, empty when there is none.
pub async fn load_cart(session: &Session) -> Cart {
    session
        .get::<Cart>(keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Store the cart in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(keys::CART, cart).await?;
    Ok(())
}

// =============================================================================
// Forms
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i32,
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: i32,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct CouponForm {
    pub code: String,
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub summary: CheckoutSummary,
}

/// Cart items fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: Cart,
}

/// Cart count badge fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

fn cart_updated(fragment: impl IntoResponse) -> Response {
    (AppendHeaders([("HX-Trigger", "cart-updated")]), fragment).into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Cart page with current prices, coupon, and shipping.
#[instrument(skip(state, session, page))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let cart = load_cart(&session).await;
    let policy = state.platform_settings().await?.shipping_policy();
    let summary = CheckoutService::new(state.pool())
        .summarize(&cart, &policy)
        .await?;

    // Keep the repriced cart so the badge and checkout agree with the page.
    if summary.cart != cart {
        save_cart(&session, &summary.cart).await?;
    }

    Ok(CartShowTemplate { page, summary })
}

/// Add a product (HTMX). Returns the count badge.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let product = ProductRepository::new(state.pool())
        .get(ProductId::new(form.product_id))
        .await?
        .filter(|p| p.is_listed() && p.in_stock())
        .ok_or_else(|| AppError::BadRequest("This product is not available".to_owned()))?;

    let mut cart = load_cart(&session).await;
    cart.add(CartLine {
        product_id: product.id,
        seller_id: product.seller_id,
        seller_name: product.seller_name.clone(),
        title: product.title.clone(),
        unit_price: product.price,
        quantity: form.quantity.unwrap_or(1),
        image_url: product.image_url.clone(),
    });
    save_cart(&session, &cart).await?;

    tracing::debug!(product_id = %product.id, items = cart.item_count(), "Added to cart");

    Ok(cart_updated(CartCountTemplate {
        count: cart.item_count(),
    }))
}

/// Change a line's quantity (HTMX). Zero removes the line.
#[instrument(skip(session))]
pub async fn update(session: Session, Form(form): Form<UpdateCartForm>) -> Result<Response> {
    let mut cart = load_cart(&session).await;
    cart.set_quantity(ProductId::new(form.product_id), form.quantity);
    save_cart(&session, &cart).await?;
    Ok(cart_updated(CartItemsTemplate { cart }))
}

/// Remove a line (HTMX).
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<RemoveFromCartForm>) -> Result<Response> {
    let mut cart = load_cart(&session).await;
    cart.remove(ProductId::new(form.product_id));
    save_cart(&session, &cart).await?;
    Ok(cart_updated(CartItemsTemplate { cart }))
}

/// Count badge fragment.
pub async fn count(session: Session) -> impl IntoResponse {
    CartCountTemplate {
        count: load_cart(&session).await.item_count(),
    }
}

/// Apply a coupon code to the cart.
///
/// The code is stored even when it does not currently apply; the cart page
/// explains why, and it starts counting once the cart qualifies.
#[instrument(skip(state, session))]
pub async fn apply_coupon(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CouponForm>,
) -> Result<Redirect> {
    let Some(code) = normalize_code(&form.code) else {
        flash_error(&session, "That is not a valid coupon code").await;
        return Ok(Redirect::to("/cart"));
    };

    let mut cart = load_cart(&session).await;
    cart.coupon_code = Some(code.clone());

    match CheckoutService::new(state.pool())
        .resolve_coupon(&cart, chrono::Utc::now())
        .await
    {
        Ok(_) => flash_success(&session, format!("Coupon {code} applied")).await,
        Err(crate::services::checkout::CheckoutError::Coupon(e)) => {
            flash_error(&session, format!("Coupon {code}: {e}")).await;
        }
        Err(e) => return Err(e.into()),
    }

    save_cart(&session, &cart).await?;
    Ok(Redirect::to("/cart"))
}

/// Drop the cart's coupon.
pub async fn remove_coupon(session: Session) -> Result<Redirect> {
    let mut cart = load_cart(&session).await;
    cart.coupon_code = None;
    save_cart(&session, &cart).await?;
    Ok(Redirect::to("/cart"))
}
