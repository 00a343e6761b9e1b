//! Content moderation: hiding products and removing questions.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use livestall_core::{ProductId, ProductStatus, QuestionId};

use crate::db::{ProductRepository, QuestionRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireAdmin, flash_success};
use crate::models::{Product, ProductQuestion};
use crate::routes::layout::PageContext;
use crate::state::AppState;

const PRODUCT_LIMIT: i64 = 100;
const QUESTION_LIMIT: i64 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ModerationQuery {
    pub q: Option<String>,
    pub status: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/moderation.html")]
pub struct ModerationTemplate {
    pub page: PageContext,
    pub products: Vec<Product>,
    pub questions: Vec<ProductQuestion>,
    pub q: String,
    pub status: String,
    pub statuses: &'static [ProductStatus],
}

#[instrument(skip(state, page, admin), fields(user_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<ModerationQuery>,
) -> Result<impl IntoResponse> {
    let status = query
        .status
        .as_deref()
        .and_then(|s| ProductStatus::from_str(s).ok());
    let search = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());

    let products = ProductRepository::new(state.pool())
        .list_all(status, search, PRODUCT_LIMIT)
        .await?;
    let questions = QuestionRepository::new(state.pool())
        .list_recent(QUESTION_LIMIT)
        .await?;

    Ok(ModerationTemplate {
        page,
        products,
        questions,
        q: search.unwrap_or_default().to_owned(),
        status: status.map(|s| s.as_str().to_owned()).unwrap_or_default(),
        statuses: ProductStatus::ALL,
    })
}

async fn moderate_product(
    state: &AppState,
    session: &Session,
    id: ProductId,
    status: ProductStatus,
) -> Result<Redirect> {
    ProductRepository::new(state.pool()).set_status(id, status).await?;
    state.catalog().invalidate(id).await;
    tracing::info!(product_id = %id, status = %status, "Product moderated");
    flash_success(
        session,
        match status {
            ProductStatus::Hidden => "Product hidden",
            _ => "Product restored",
        },
    )
    .await;
    Ok(Redirect::to("/admin/moderation"))
}

#[instrument(skip(state, session, admin), fields(user_id = %admin.id))]
pub async fn hide_product(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    moderate_product(&state, &session, ProductId::new(id), ProductStatus::Hidden).await
}

/// Put a hidden product back on sale.
#[instrument(skip(state, session, admin), fields(user_id = %admin.id))]
pub async fn restore_product(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    moderate_product(&state, &session, ProductId::new(id), ProductStatus::Active).await
}

#[instrument(skip(state, session, admin), fields(user_id = %admin.id))]
pub async fn delete_question(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    let product_id = QuestionRepository::new(state.pool())
        .delete(QuestionId::new(id))
        .await?;
    state.catalog().invalidate(product_id).await;
    tracing::info!(question_id = id, product_id = %product_id, "Question deleted");
    flash_success(&session, "Question deleted").await;
    Ok(Redirect::to("/admin/moderation"))
}
