//! Questions buyers asked about the seller's products.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use livestall_core::QuestionId;
use livestall_core::validation::validate_answer;

use crate::db::QuestionRepository;
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireSeller, flash_error, flash_success};
use crate::models::ProductQuestion;
use crate::routes::layout::PageContext;
use crate::routes::safe_redirect;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "seller/questions.html")]
pub struct QuestionsTemplate {
    pub page: PageContext,
    pub questions: Vec<ProductQuestion>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerForm {
    pub answer: String,
    /// Page to go back to (the product page or the question list).
    #[serde(default)]
    pub return_to: Option<String>,
}

#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RequireSeller(user): RequireSeller,
) -> Result<impl IntoResponse> {
    let questions = QuestionRepository::new(state.pool())
        .list_for_seller(user.id)
        .await?;
    Ok(QuestionsTemplate { page, questions })
}

/// Answer (or re-answer) a question on one of the seller's products.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn answer(
    State(state): State<AppState>,
    session: Session,
    RequireSeller(user): RequireSeller,
    Path(id): Path<i32>,
    Form(form): Form<AnswerForm>,
) -> Result<Redirect> {
    let back = safe_redirect(form.return_to.as_deref(), "/seller/questions");

    let answer = match validate_answer(&form.answer) {
        Ok(answer) => answer,
        Err(errors) => {
            flash_error(&session, errors.to_string()).await;
            return Ok(back);
        }
    };

    let product_id = QuestionRepository::new(state.pool())
        .answer(QuestionId::new(id), user.id, &answer)
        .await?;
    state.catalog().invalidate(product_id).await;
    flash_success(&session, "Answer posted").await;
    Ok(back)
}
