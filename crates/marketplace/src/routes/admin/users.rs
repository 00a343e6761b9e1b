//! User administration and impersonation.

use std::str::FromStr;

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

use livestall_core::{AccountStatus, UserId, UserRole};

use crate::db::UserRepository;
use crate::error::{AppError, Result, set_sentry_user};
use crate::filters;
use crate::middleware::{
    RequireAdmin, RequireAuth, flash_error, flash_success, impersonator_of, set_current_user,
    start_impersonation,
};
use crate::models::{CurrentUser, User};
use crate::routes::layout::PageContext;
use crate::state::AppState;

const PAGE_SIZE: i64 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub q: Option<String>,
    pub page: Option<u32>,
}

impl UserQuery {
    fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
    pub page: PageContext,
    pub users: Vec<User>,
    pub q: String,
    pub current_page: u32,
    pub has_next: bool,
    pub roles: &'static [UserRole],
}

impl UsersTemplate {
    #[must_use]
    pub fn page_link(&self, page: u32) -> String {
        if self.q.is_empty() {
            format!("/admin/users?page={page}")
        } else {
            format!("/admin/users?q={}&page={page}", urlencoding::encode(&self.q))
        }
    }
}

#[instrument(skip(state, page, admin), fields(user_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse> {
    let current_page = query.page();
    let offset = i64::from(current_page - 1) * PAGE_SIZE;
    // One extra row tells us whether there is a next page.
    let mut users = UserRepository::new(state.pool())
        .list(query.search(), PAGE_SIZE + 1, offset)
        .await?;
    let limit = usize::try_from(PAGE_SIZE).unwrap_or(usize::MAX);
    let has_next = users.len() > limit;
    users.truncate(limit);

    Ok(UsersTemplate {
        page,
        users,
        q: query.search().unwrap_or_default().to_owned(),
        current_page,
        has_next,
        roles: UserRole::ALL,
    })
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Suspend or reactivate an account.
#[instrument(skip(state, session, admin), fields(user_id = %admin.id))]
pub async fn set_status(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect> {
    let target = UserId::new(id);
    let status = AccountStatus::from_str(&form.status).map_err(AppError::BadRequest)?;
    if target == admin.id {
        flash_error(&session, "You cannot change your own account status").await;
        return Ok(Redirect::to("/admin/users"));
    }

    UserRepository::new(state.pool()).set_status(target, status).await?;
    tracing::info!(target_user = %target, status = %status, "Account status changed");
    flash_success(&session, format!("Account is now {status}")).await;
    Ok(Redirect::to("/admin/users"))
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

#[instrument(skip(state, session, admin), fields(user_id = %admin.id))]
pub async fn set_role(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
    Form(form): Form<RoleForm>,
) -> Result<Redirect> {
    let target = UserId::new(id);
    let role = UserRole::from_str(&form.role).map_err(AppError::BadRequest)?;
    if target == admin.id {
        flash_error(&session, "You cannot change your own role").await;
        return Ok(Redirect::to("/admin/users"));
    }

    UserRepository::new(state.pool()).set_role(target, role).await?;
    tracing::info!(target_user = %target, role = %role, "Role changed");
    flash_success(&session, format!("Role changed to {role}")).await;
    Ok(Redirect::to("/admin/users"))
}

/// Act as another user. The admin's identity rides along in the session.
#[instrument(skip(state, session, admin), fields(user_id = %admin.id))]
pub async fn impersonate(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    let target = UserRepository::new(state.pool())
        .get_by_id(UserId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("user".to_owned()))?;

    let acting = match crate::middleware::impersonate(&admin, CurrentUser::from(&target)) {
        Ok(acting) => acting,
        Err(e) => {
            flash_error(&session, e.to_string()).await;
            return Ok(Redirect::to("/admin/users"));
        }
    };

    start_impersonation(&session, &acting).await?;
    tracing::warn!(admin_id = %admin.id, target_user = %target.id, "Impersonation started");
    flash_success(&session, format!("You are now acting as {}", target.display_name)).await;
    Ok(Redirect::to("/"))
}

/// Return to the admin identity behind an impersonated session.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn stop_impersonating(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Redirect> {
    let Some(admin_id) = impersonator_of(&user) else {
        return Ok(Redirect::to("/"));
    };

    let admin = UserRepository::new(state.pool())
        .get_by_id(admin_id)
        .await?
        .filter(|a| a.role == UserRole::Admin && !a.is_suspended())
        .ok_or_else(|| AppError::Forbidden("admin account is no longer available".to_owned()))?;

    session.remove_value(crate::models::session::keys::CART).await?;
    set_current_user(&session, &CurrentUser::from(&admin)).await?;
    set_sentry_user(&admin.id, Some(admin.email.as_str()));
    tracing::warn!(admin_id = %admin.id, target_user = %user.id, "Impersonation ended");
    flash_success(&session, "Welcome back").await;
    Ok(Redirect::to("/admin/users"))
}
