//! Scheduling and running live selling sessions.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use livestall_core::validation::LiveStreamInput;
use livestall_core::{LiveStreamId, LiveStreamStatus, ProductId, UserId};

use crate::db::{LiveStreamRepository, NewLiveStream, ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireSeller, flash_error, flash_success};
use crate::models::{LiveStream, Product};
use crate::routes::layout::PageContext;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "seller/live.html")]
pub struct LiveStreamsTemplate {
    pub page: PageContext,
    pub streams: Vec<LiveStream>,
    /// Products that can be featured.
    pub products: Vec<Product>,
    pub input: LiveStreamInput,
    pub selected: Vec<ProductId>,
}

impl LiveStreamsTemplate {
    #[must_use]
    pub fn is_selected(&self, id: ProductId) -> bool {
        self.selected.contains(&id)
    }
}

/// Split the repeated `product_ids` keys off a stream form.
fn parse_stream_form(pairs: Vec<(String, String)>) -> (LiveStreamInput, Vec<ProductId>) {
    let mut input = LiveStreamInput::default();
    let mut product_ids = Vec::new();
    for (key, value) in pairs {
        match key.as_str() {
            "title" => input.title = value,
            "description" => input.description = value,
            "scheduled_at" => input.scheduled_at = value,
            "product_ids" => {
                if let Ok(id) = value.parse::<i32>() {
                    product_ids.push(ProductId::new(id));
                }
            }
            _ => {}
        }
    }
    (input, product_ids)
}

async fn render(
    state: &AppState,
    page: PageContext,
    seller: UserId,
    input: LiveStreamInput,
    selected: Vec<ProductId>,
) -> Result<Response> {
    let streams = LiveStreamRepository::new(state.pool())
        .list_for_seller(seller)
        .await?;
    let products = ProductRepository::new(state.pool())
        .list_by_seller(seller)
        .await?;
    Ok(LiveStreamsTemplate {
        page,
        streams,
        products,
        input,
        selected,
    }
    .into_response())
}

#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RequireSeller(user): RequireSeller,
) -> Result<Response> {
    render(&state, page, user.id, LiveStreamInput::default(), Vec::new()).await
}

#[instrument(skip(state, session, page, user, pairs), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireSeller(user): RequireSeller,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let (input, product_ids) = parse_stream_form(pairs);
    let fields = match input.validate() {
        Ok(fields) => fields,
        Err(errors) => {
            let page = page.with_error(errors.to_string());
            return render(&state, page, user.id, input, product_ids).await;
        }
    };

    let id = LiveStreamRepository::new(state.pool())
        .create(&NewLiveStream {
            seller_id: user.id,
            title: &fields.title,
            description: &fields.description,
            scheduled_at: fields.scheduled_at,
            product_ids: &product_ids,
        })
        .await?;

    tracing::info!(stream_id = %id, "Live stream scheduled");
    flash_success(&session, format!("\"{}\" scheduled", fields.title)).await;
    Ok(Redirect::to("/seller/live").into_response())
}

async fn transition(
    state: &AppState,
    session: &Session,
    seller: UserId,
    id: LiveStreamId,
    status: LiveStreamStatus,
) -> Result<Redirect> {
    match LiveStreamRepository::new(state.pool())
        .set_status(id, seller, status)
        .await
    {
        Ok(()) => {
            tracing::info!(stream_id = %id, status = %status, "Live stream status changed");
            let message = match status {
                LiveStreamStatus::Live => "You are live",
                _ => "Stream ended",
            };
            flash_success(session, message).await;
        }
        Err(RepositoryError::NotFound) => {
            flash_error(session, "That stream has already ended").await;
        }
        Err(e) => return Err(AppError::from(e)),
    }
    Ok(Redirect::to("/seller/live"))
}

#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn start(
    State(state): State<AppState>,
    session: Session,
    RequireSeller(user): RequireSeller,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    transition(&state, &session, user.id, LiveStreamId::new(id), LiveStreamStatus::Live).await
}

#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn end(
    State(state): State<AppState>,
    session: Session,
    RequireSeller(user): RequireSeller,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    transition(&state, &session, user.id, LiveStreamId::new(id), LiveStreamStatus::Ended).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stream_form_collects_products() {
        let pairs = vec![
            ("title".to_owned(), "Friday drop".to_owned()),
            ("scheduled_at".to_owned(), "2025-06-06T19:00".to_owned()),
            ("product_ids".to_owned(), "3".to_owned()),
            ("product_ids".to_owned(), "7".to_owned()),
            ("product_ids".to_owned(), "nope".to_owned()),
        ];
        let (input, ids) = parse_stream_form(pairs);
        assert_eq!(input.title, "Friday drop");
        assert!(input.description.is_empty());
        assert_eq!(ids, vec![ProductId::new(3), ProductId::new(7)]);
    }
}
