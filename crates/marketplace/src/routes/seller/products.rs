//! Seller product management and image uploads.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use livestall_core::validation::ProductInput;
use livestall_core::{ProductId, ProductImageId, ProductStatus};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireSeller, flash_error, flash_success};
use crate::models::{Product, ProductImage};
use crate::routes::layout::PageContext;
use crate::services::media::MediaError;
use crate::state::AppState;

use super::owned_product;

#[derive(Template, WebTemplate)]
#[template(path = "seller/products/index.html")]
pub struct ProductsTemplate {
    pub page: PageContext,
    pub products: Vec<Product>,
}

#[derive(Template, WebTemplate)]
#[template(path = "seller/products/form.html")]
pub struct ProductFormTemplate {
    pub page: PageContext,
    /// `None` for a new product.
    pub product_id: Option<ProductId>,
    pub input: ProductInput,
    pub status: String,
    /// Set when moderation hid the product; the seller cannot change it.
    pub hidden: bool,
    pub images: Vec<ProductImage>,
    pub statuses: &'static [ProductStatus],
}

impl ProductFormTemplate {
    fn new(page: PageContext, input: ProductInput, status: String) -> Self {
        Self {
            page,
            product_id: None,
            input,
            status,
            hidden: false,
            images: Vec::new(),
            statuses: ProductStatus::SELLER_SETTABLE,
        }
    }

    #[must_use]
    pub fn action(&self) -> String {
        self.product_id
            .map_or_else(|| "/seller/products".to_owned(), |id| format!("/seller/products/{id}"))
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductForm {
    #[serde(flatten)]
    pub input: ProductInput,
    pub status: String,
}

fn seller_status(raw: &str) -> Result<ProductStatus> {
    ProductStatus::from_str(raw)
        .ok()
        .filter(|s| ProductStatus::SELLER_SETTABLE.contains(s))
        .ok_or_else(|| AppError::BadRequest(format!("invalid product status: {raw}")))
}

#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RequireSeller(user): RequireSeller,
) -> Result<impl IntoResponse> {
    let products = ProductRepository::new(state.pool())
        .list_by_seller(user.id)
        .await?;
    Ok(ProductsTemplate { page, products })
}

pub async fn new_form(page: PageContext, RequireSeller(_user): RequireSeller) -> impl IntoResponse {
    ProductFormTemplate::new(
        page,
        ProductInput::default(),
        ProductStatus::Draft.to_string(),
    )
}

#[instrument(skip(state, page, user, form), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireSeller(user): RequireSeller,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let status = seller_status(&form.status)?;
    let fields = match form.input.validate() {
        Ok(fields) => fields,
        Err(errors) => {
            return Ok(
                ProductFormTemplate::new(page.with_error(errors.to_string()), form.input, form.status)
                    .into_response(),
            );
        }
    };

    let id = ProductRepository::new(state.pool())
        .create(user.id, &fields, status)
        .await?;
    tracing::info!(product_id = %id, "Product created");
    flash_success(&session, "Product created. Add some photos").await;
    Ok(Redirect::to(&format!("/seller/products/{id}")).into_response())
}

#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn edit_form(
    State(state): State<AppState>,
    page: PageContext,
    RequireSeller(user): RequireSeller,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let product = owned_product(&state, ProductId::new(id), user.id).await?;
    let images = ProductRepository::new(state.pool()).images(product.id).await?;

    Ok(ProductFormTemplate {
        product_id: Some(product.id),
        hidden: product.status == ProductStatus::Hidden,
        images,
        ..ProductFormTemplate::new(
            page,
            ProductInput {
                title: product.title,
                description: product.description,
                price: format!("{:.2}", product.price),
                stock: product.stock.to_string(),
                category: product.category,
            },
            product.status.to_string(),
        )
    })
}

#[instrument(skip(state, session, page, user, form), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireSeller(user): RequireSeller,
    Path(id): Path<i32>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let product = owned_product(&state, ProductId::new(id), user.id).await?;
    let status = seller_status(&form.status)?;

    let fields = match form.input.validate() {
        Ok(fields) => fields,
        Err(errors) => {
            let images = ProductRepository::new(state.pool()).images(product.id).await?;
            return Ok(ProductFormTemplate {
                product_id: Some(product.id),
                hidden: product.status == ProductStatus::Hidden,
                images,
                ..ProductFormTemplate::new(page.with_error(errors.to_string()), form.input, form.status)
            }
            .into_response());
        }
    };

    ProductRepository::new(state.pool())
        .update(product.id, user.id, &fields, status)
        .await?;
    state.catalog().invalidate(product.id).await;
    flash_success(&session, "Product saved").await;
    Ok(Redirect::to(&format!("/seller/products/{}", product.id)).into_response())
}

/// Read the `image` field of a multipart upload, enforcing the size limit
/// while streaming.
async fn read_image(multipart: &mut Multipart, limit: usize) -> Result<Vec<u8>> {
    let bad_upload = |e: axum::extract::multipart::MultipartError| {
        AppError::BadRequest(format!("upload failed: {e}"))
    };

    while let Some(mut field) = multipart.next_field().await.map_err(bad_upload)? {
        if field.name() != Some("image") {
            continue;
        }
        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(bad_upload)? {
            if bytes.len() + chunk.len() > limit {
                return Err(MediaError::TooLarge { limit }.into());
            }
            bytes.extend_from_slice(&chunk);
        }
        return Ok(bytes);
    }

    Err(MediaError::Empty.into())
}

/// Upload a product photo (JPEG, PNG, WebP, or GIF).
#[instrument(skip(state, session, user, multipart), fields(user_id = %user.id))]
pub async fn upload_image(
    State(state): State<AppState>,
    session: Session,
    RequireSeller(user): RequireSeller,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Redirect> {
    let product = owned_product(&state, ProductId::new(id), user.id).await?;
    let back = format!("/seller/products/{}#images", product.id);

    let saved = match read_image(&mut multipart, state.media().max_bytes()).await {
        Ok(bytes) => state.media().save_image(&bytes).await.map_err(AppError::from),
        Err(e) => Err(e),
    };

    match saved {
        Ok(url) => {
            ProductRepository::new(state.pool())
                .add_image(product.id, &url)
                .await?;
            state.catalog().invalidate(product.id).await;
            flash_success(&session, "Photo added").await;
        }
        Err(AppError::Media(e)) if !matches!(e, MediaError::Io(_)) => {
            flash_error(&session, e.to_string()).await;
        }
        Err(AppError::BadRequest(message)) => flash_error(&session, message).await,
        Err(e) => return Err(e),
    }
    Ok(Redirect::to(&back))
}

#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn delete_image(
    State(state): State<AppState>,
    session: Session,
    RequireSeller(user): RequireSeller,
    Path((id, image_id)): Path<(i32, i32)>,
) -> Result<Redirect> {
    let product = owned_product(&state, ProductId::new(id), user.id).await?;
    let url = ProductRepository::new(state.pool())
        .delete_image(product.id, ProductImageId::new(image_id))
        .await?;
    if let Err(e) = state.media().delete(&url).await {
        tracing::warn!(error = %e, url = %url, "Could not delete image file");
    }
    state.catalog().invalidate(product.id).await;
    flash_success(&session, "Photo removed").await;
    Ok(Redirect::to(&format!("/seller/products/{}#images", product.id)))
}
