//! Product listing, detail, and questions.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use livestall_core::ProductId;
use livestall_core::validation::validate_question;

use crate::db::products::ProductPage;
use crate::db::{ProductRepository, QuestionRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth, flash_error, flash_success};
use crate::models::{ProductQuery, ProductSort};
use crate::services::catalog::ProductDetail;
use crate::state::AppState;

use super::layout::PageContext;

#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductIndexTemplate {
    pub page: PageContext,
    pub results: ProductPage,
    pub categories: Vec<String>,
    pub q: String,
    pub category: String,
    pub sort: &'static str,
    pub sorts: Vec<(&'static str, &'static str)>,
    pub current_page: u32,
}

impl ProductIndexTemplate {
    /// Query string for another page of the same search.
    #[must_use]
    pub fn page_link(&self, page: u32) -> String {
        format!(
            "/products?q={}&category={}&sort={}&page={page}",
            urlencoding::encode(&self.q),
            urlencoding::encode(&self.category),
            self.sort
        )
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        i64::from(self.current_page) < self.results.page_count()
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub detail: Arc<ProductDetail>,
    /// The viewer owns this product and may answer questions.
    pub is_owner: bool,
}

#[derive(Debug, Deserialize)]
pub struct QuestionForm {
    pub question: String,
}

/// Search and browse active products.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<ProductQuery>,
) -> Result<impl IntoResponse> {
    let products = ProductRepository::new(state.pool());
    let results = products.search(&query).await?;
    let categories = products.categories().await?;

    Ok(ProductIndexTemplate {
        page,
        current_page: query.page(),
        q: query.search_text().unwrap_or_default().to_owned(),
        category: query.category_filter().unwrap_or_default().to_owned(),
        sort: query.sort.as_str(),
        sorts: [ProductSort::Newest, ProductSort::PriceAsc, ProductSort::PriceDesc]
            .iter()
            .map(|s| (s.as_str(), sort_label(*s)))
            .collect(),
        results,
        categories,
    })
}

const fn sort_label(sort: ProductSort) -> &'static str {
    match sort {
        ProductSort::Newest => "Newest",
        ProductSort::PriceAsc => "Price: low to high",
        ProductSort::PriceDesc => "Price: high to low",
    }
}

/// Product detail page.
///
/// Products that are not active are only visible to their seller and admins.
#[instrument(skip(state, page, auth))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    auth: OptionalAuth,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let id = ProductId::new(id);
    let detail = state
        .catalog()
        .product(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("product".to_owned()))?;

    let viewer = auth.0.as_ref();
    let is_owner = viewer.is_some_and(|u| u.id == detail.product.seller_id);
    let is_admin = viewer.is_some_and(crate::models::CurrentUser::is_admin);
    if !detail.product.is_listed() && !is_owner && !is_admin {
        return Err(AppError::NotFound("product".to_owned()));
    }

    Ok(ProductShowTemplate {
        page,
        detail,
        is_owner,
    })
}

/// Ask a question about a product.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn ask(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    Form(form): Form<QuestionForm>,
) -> Result<Redirect> {
    let id = ProductId::new(id);
    let back = format!("/products/{id}#questions");

    let question = match validate_question(&form.question) {
        Ok(q) => q,
        Err(errors) => {
            flash_error(&session, errors.to_string()).await;
            return Ok(Redirect::to(&back));
        }
    };

    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .filter(|p| p.is_listed())
        .ok_or_else(|| AppError::NotFound("product".to_owned()))?;
    if product.seller_id == user.id {
        flash_error(&session, "You cannot ask questions about your own product").await;
        return Ok(Redirect::to(&back));
    }

    QuestionRepository::new(state.pool())
        .ask(id, user.id, &question)
        .await?;
    state.catalog().invalidate(id).await;
    flash_success(&session, "Your question was posted").await;

    Ok(Redirect::to(&back))
}
