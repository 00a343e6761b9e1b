//! Buyer-seller messaging.
//!
//! A conversation is unique per buyer, seller, and optional product. Only
//! its two participants can read or post.

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

use livestall_core::validation::validate_message;
use livestall_core::{ConversationId, ProductId, UserId};

use crate::db::ConversationRepository;
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireAuth, flash_error};
use crate::models::{ConversationSummary, Message};
use crate::state::AppState;

use super::layout::PageContext;

#[derive(Template, WebTemplate)]
#[template(path = "messages/index.html")]
pub struct InboxTemplate {
    pub page: PageContext,
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Template, WebTemplate)]
#[template(path = "messages/show.html")]
pub struct ConversationTemplate {
    pub page: PageContext,
    pub conversation: ConversationSummary,
    pub messages: Vec<Message>,
    pub me: UserId,
}

#[derive(Debug, Deserialize)]
pub struct StartForm {
    pub seller_id: i32,
    pub product_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SendForm {
    pub body: String,
}

/// Conversations with their last message and unread count.
#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let conversations = ConversationRepository::new(state.pool())
        .inbox(user.id)
        .await?;
    Ok(InboxTemplate {
        page,
        conversations,
    })
}

/// Open (or reuse) a conversation with a seller.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn start(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<StartForm>,
) -> Result<Redirect> {
    let id = ConversationRepository::new(state.pool())
        .find_or_create(
            user.id,
            UserId::new(form.seller_id),
            form.product_id.map(ProductId::new),
        )
        .await?;
    Ok(Redirect::to(&format!("/messages/{id}")))
}

/// Show a conversation and mark the other side's messages read.
#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let repo = ConversationRepository::new(state.pool());
    let conversation = repo
        .get_for_participant(ConversationId::new(id), user.id)
        .await?;
    repo.mark_read(conversation.id, user.id).await?;
    let messages = repo.messages(conversation.id).await?;

    Ok(ConversationTemplate {
        page,
        conversation,
        messages,
        me: user.id,
    })
}

/// Post a message.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn send(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    Form(form): Form<SendForm>,
) -> Result<Redirect> {
    let id = ConversationId::new(id);
    let back = format!("/messages/{id}#latest");

    let body = match validate_message(&form.body) {
        Ok(body) => body,
        Err(errors) => {
            flash_error(&session, errors.to_string()).await;
            return Ok(Redirect::to(&back));
        }
    };

    ConversationRepository::new(state.pool())
        .send(id, user.id, &body)
        .await?;
    Ok(Redirect::to(&back))
}
