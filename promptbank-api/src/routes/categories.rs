/// Category endpoints
///
/// - `GET  /api/categories` - All categories with prompt counts
/// - `POST /categories` - Create (EDITOR, ADMIN)
/// - `POST /categories/:id/delete` - Delete an unused category (EDITOR, ADMIN)

use axum::{
    extract::{Path, State},
    Form, Json,
};
use promptbank_shared::commands::category::CategoryForm;
use promptbank_shared::models::category::CategoryWithCount;
use promptbank_shared::services::categories;
use uuid::Uuid;

use super::{CurrentUser, FormUser};
use crate::app::AppState;
use crate::error::{status_redirect, ApiResult, FormError, FormResult};

const PAGE: &str = "/categories";

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> ApiResult<Json<Vec<CategoryWithCount>>> {
    Ok(Json(categories::list_categories(&state.db).await?))
}

pub async fn create(
    State(state): State<AppState>,
    FormUser(user): FormUser,
    Form(form): Form<CategoryForm>,
) -> FormResult {
    categories::create_category(&state.db, &user.actor(), form)
        .await
        .map_err(FormError::at(PAGE, PAGE))?;
    Ok(status_redirect(PAGE, "created"))
}

pub async fn delete(
    State(state): State<AppState>,
    FormUser(user): FormUser,
    Path(category_id): Path<Uuid>,
) -> FormResult {
    categories::delete_category(&state.db, &user.actor(), category_id)
        .await
        .map_err(FormError::at(PAGE, PAGE))?;
    Ok(status_redirect(PAGE, "deleted"))
}
