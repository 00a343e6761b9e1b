//! Public live stream pages.
//!
//! Streams have no video transport; the page shows the status and the
//! featured products.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::instrument;

use livestall_core::LiveStreamId;

use crate::db::{LiveStreamRepository, ProductRepository};
use crate::error::Result;
use crate::filters;
use crate::models::{LiveStream, Product};
use crate::state::AppState;

use super::layout::PageContext;

const STREAM_LIST_LIMIT: i64 = 50;

#[derive(Template, WebTemplate)]
#[template(path = "live/index.html")]
pub struct LiveIndexTemplate {
    pub page: PageContext,
    pub streams: Vec<LiveStream>,
}

#[derive(Template, WebTemplate)]
#[template(path = "live/show.html")]
pub struct LiveShowTemplate {
    pub page: PageContext,
    pub stream: LiveStream,
    pub products: Vec<Product>,
}

/// Live now and upcoming streams.
#[instrument(skip(state, page))]
pub async fn index(State(state): State<AppState>, page: PageContext) -> Result<impl IntoResponse> {
    let streams = LiveStreamRepository::new(state.pool())
        .list_public(STREAM_LIST_LIMIT)
        .await?;
    Ok(LiveIndexTemplate { page, streams })
}

/// One stream and the listed products it features.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let stream = LiveStreamRepository::new(state.pool())
        .get(LiveStreamId::new(id))
        .await?;
    let products = ProductRepository::new(state.pool())
        .get_many(&stream.product_ids)
        .await?
        .into_iter()
        .filter(crate::models::Product::is_listed)
        .collect();

    Ok(LiveShowTemplate {
        page,
        stream,
        products,
    })
}
