//! Checkout: shipping address, order summary, and placing the orders.
//!
//! Payment is collected on delivery, so placing the order is the last step.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireAuth, flash_error, flash_success};
use crate::models::ShippingAddress;
use crate::services::checkout::{CheckoutError, CheckoutService, CheckoutSummary};
use crate::state::AppState;

use super::cart::{load_cart, save_cart};
use super::layout::PageContext;

#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub page: PageContext,
    pub summary: CheckoutSummary,
    pub address: ShippingAddress,
}

/// Address form and per-seller order summary.
#[instrument(skip(state, session, page, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let cart = load_cart(&session).await;
    if cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    let policy = state.platform_settings().await?.shipping_policy();
    let summary = CheckoutService::new(state.pool())
        .summarize(&cart, &policy)
        .await?;
    if summary.cart != cart {
        save_cart(&session, &summary.cart).await?;
    }

    let address = ShippingAddress {
        name: user.display_name.clone(),
        ..ShippingAddress::default()
    };

    Ok(CheckoutTemplate {
        page,
        summary,
        address,
    }
    .into_response())
}

/// Place one order per seller, clear the cart, and email a confirmation.
#[instrument(skip(state, session, page, user, address), fields(user_id = %user.id))]
pub async fn place(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireAuth(user): RequireAuth,
    Form(address): Form<ShippingAddress>,
) -> Result<Response> {
    let cart = load_cart(&session).await;
    let policy = state.platform_settings().await?.shipping_policy();
    let checkout = CheckoutService::new(state.pool());

    let receipt = match checkout.place(&user, &cart, &address, &policy).await {
        Ok(receipt) => receipt,
        Err(CheckoutError::Repository(e)) => return Err(e.into()),
        Err(CheckoutError::EmptyCart) => {
            flash_error(&session, "Your cart is empty").await;
            return Ok(Redirect::to("/cart").into_response());
        }
        Err(e) => {
            // Re-render with the buyer's input and the reason.
            let summary = checkout.summarize(&cart, &policy).await?;
            if summary.cart != cart {
                save_cart(&session, &summary.cart).await?;
            }
            return Ok(CheckoutTemplate {
                page: page.with_error(e.to_string()),
                summary,
                address,
            }
            .into_response());
        }
    };

    save_cart(&session, &livestall_core::cart::Cart::new()).await?;

    let ids: Vec<&str> = receipt.orders.iter().map(|o| o.public_id.as_str()).collect();
    flash_success(&session, format!("Order placed: {}", ids.join(", "))).await;

    let email_state = state.clone();
    let orders_url = format!("{}/orders", state.config().base_url.trim_end_matches('/'));
    tokio::spawn(async move {
        CheckoutService::send_confirmation(email_state.email(), &user, &receipt, &orders_url)
            .await;
    });

    Ok(Redirect::to("/orders").into_response())
}
