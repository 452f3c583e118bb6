/// User administration endpoints (ADMIN only)
///
/// - `GET  /api/users`
/// - `POST /users` - Create
/// - `POST /users/:id/role` - Change role
/// - `POST /users/:id/password` - Reset password and clear lockout
/// - `POST /users/:id/unlock` - Clear lockout
/// - `POST /users/:id/delete`

use axum::{
    extract::{Path, State},
    Form, Json,
};
use chrono::{DateTime, Utc};
use promptbank_shared::commands::user::{CreateUserForm, PasswordForm, RoleForm};
use promptbank_shared::models::user::{User, UserRole};
use promptbank_shared::services::users;
use serde::Serialize;
use uuid::Uuid;

use super::{CurrentUser, FormUser};
use crate::app::AppState;
use crate::error::{status_redirect, ApiResult, FormError, FormResult};

const PAGE: &str = "/users";

/// Row of the user admin table
#[derive(Debug, Serialize)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub failed_logins: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub is_locked: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    fn new(user: User, now: DateTime<Utc>) -> Self {
        Self {
            is_locked: user.is_locked(now),
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            failed_logins: user.failed_logins,
            locked_until: user.locked_until,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

pub async fn list(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> ApiResult<Json<Vec<UserRow>>> {
    let now = Utc::now();
    let rows = users::list_users(&state.db, &user.actor())
        .await?
        .into_iter()
        .map(|u| UserRow::new(u, now))
        .collect();
    Ok(Json(rows))
}

pub async fn create(
    State(state): State<AppState>,
    FormUser(user): FormUser,
    Form(form): Form<CreateUserForm>,
) -> FormResult {
    users::create_user(&state.db, &user.actor(), form)
        .await
        .map_err(FormError::at(PAGE, PAGE))?;
    Ok(status_redirect(PAGE, "created"))
}

pub async fn update_role(
    State(state): State<AppState>,
    FormUser(user): FormUser,
    Path(user_id): Path<Uuid>,
    Form(form): Form<RoleForm>,
) -> FormResult {
    users::update_role(&state.db, &user.actor(), user_id, form)
        .await
        .map_err(FormError::at(PAGE, PAGE))?;
    Ok(status_redirect(PAGE, "updated"))
}

pub async fn reset_password(
    State(state): State<AppState>,
    FormUser(user): FormUser,
    Path(user_id): Path<Uuid>,
    Form(form): Form<PasswordForm>,
) -> FormResult {
    users::reset_password(&state.db, &user.actor(), user_id, form)
        .await
        .map_err(FormError::at(PAGE, PAGE))?;
    Ok(status_redirect(PAGE, "password-reset"))
}

pub async fn unlock(
    State(state): State<AppState>,
    FormUser(user): FormUser,
    Path(user_id): Path<Uuid>,
) -> FormResult {
    users::unlock_user(&state.db, &user.actor(), user_id)
        .await
        .map_err(FormError::at(PAGE, PAGE))?;
    Ok(status_redirect(PAGE, "unlocked"))
}

pub async fn delete(
    State(state): State<AppState>,
    FormUser(user): FormUser,
    Path(user_id): Path<Uuid>,
) -> FormResult {
    users::delete_user(&state.db, &user.actor(), user_id)
        .await
        .map_err(FormError::at(PAGE, PAGE))?;
    Ok(status_redirect(PAGE, "deleted"))
}
