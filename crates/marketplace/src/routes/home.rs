//! Home page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::db::{LiveStreamRepository, ProductRepository};
use crate::error::Result;
use crate::filters;
use crate::models::{LiveStream, Product};
use crate::state::AppState;

use super::layout::PageContext;

const FEATURED_PRODUCTS: i64 = 12;
const FEATURED_STREAMS: i64 = 4;

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub products: Vec<Product>,
    pub streams: Vec<LiveStream>,
}

/// Newest listings and upcoming or running live streams.
#[instrument(skip(state, page))]
pub async fn home(State(state): State<AppState>, page: PageContext) -> Result<impl IntoResponse> {
    let products = ProductRepository::new(state.pool())
        .newest(FEATURED_PRODUCTS)
        .await?;
    let streams = LiveStreamRepository::new(state.pool())
        .list_public(FEATURED_STREAMS)
        .await?;

    Ok(HomeTemplate {
        page,
        products,
        streams,
    })
}
