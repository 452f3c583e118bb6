/// Prompt endpoints
///
/// # Reads (JSON)
///
/// - `GET /api/prompts` - Visible prompts, filtered
/// - `GET /api/prompts/:id` - One prompt with permissions
/// - `GET /api/prompts/:id/history` - Versions and recent audit entries
///
/// # Form posts (redirects)
///
/// - `POST /prompts` - Create
/// - `POST /prompts/:id` - Update
/// - `POST /prompts/:id/delete`
/// - `POST /prompts/:id/save` - Toggle the caller's bookmark
/// - `POST /prompts/:id/duplicate`
/// - `POST /prompts/:id/versions/:version_id/restore`

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    Form, Json,
};
use promptbank_shared::commands::prompt::{DuplicateForm, PromptForm};
use promptbank_shared::models::prompt::PromptListFilter;
use promptbank_shared::models::prompt::PromptSummary;
use promptbank_shared::services::prompts::{self, PromptDetail, PromptHistory, PromptWrite};
use serde::Deserialize;
use uuid::Uuid;

use super::{CurrentUser, FormUser};
use crate::app::AppState;
use crate::error::{status_redirect, with_query, ApiResult, FormError, FormResult};

const HOME: &str = "/";

/// Library filters as they appear in the query string
///
/// Unrecognized values are ignored rather than rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub prompt_status: Option<String>,
    pub visibility: Option<String>,
    pub owner_scope: Option<String>,
    pub only_saved: Option<String>,
}

impl ListQuery {
    pub fn into_filter(self) -> PromptListFilter {
        PromptListFilter {
            query: self.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
            category_id: self.category.and_then(|c| Uuid::parse_str(c.trim()).ok()),
            status: self.prompt_status.and_then(|s| s.parse().ok()),
            visibility: self.visibility.and_then(|v| v.parse().ok()),
            mine_only: self.owner_scope.as_deref() == Some("mine"),
            saved_only: self.only_saved.as_deref() == Some("true"),
        }
    }
}

/// Success redirect, mentioning collaborator emails that matched no account
fn written(status: &str, write: &PromptWrite) -> Redirect {
    if write.unknown_collaborators.is_empty() {
        return status_redirect(HOME, status);
    }
    let notice = format!(
        "Ignored unknown collaborators: {}",
        write.unknown_collaborators.join(", ")
    );
    Redirect::to(&with_query(&with_query(HOME, "status", status), "notice", &notice))
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<PromptSummary>>> {
    let filter = query.into_filter();
    Ok(Json(prompts::list_prompts(&state.db, &user.actor(), &filter).await?))
}

pub async fn detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(prompt_id): Path<Uuid>,
) -> ApiResult<Json<PromptDetail>> {
    Ok(Json(prompts::prompt_detail(&state.db, &user.actor(), prompt_id).await?))
}

pub async fn history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(prompt_id): Path<Uuid>,
) -> ApiResult<Json<PromptHistory>> {
    Ok(Json(prompts::prompt_history(&state.db, &user.actor(), prompt_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    FormUser(user): FormUser,
    Form(form): Form<PromptForm>,
) -> FormResult {
    let write = prompts::create_prompt(&state.db, &user.actor(), form)
        .await
        .map_err(FormError::at("/prompts/new", HOME))?;
    Ok(written("created", &write))
}

pub async fn update(
    State(state): State<AppState>,
    FormUser(user): FormUser,
    Path(prompt_id): Path<Uuid>,
    Form(form): Form<PromptForm>,
) -> FormResult {
    let write = prompts::update_prompt(&state.db, &user.actor(), prompt_id, form)
        .await
        .map_err(FormError::at(format!("/prompts/{}/edit", prompt_id), HOME))?;
    Ok(written("updated", &write))
}

pub async fn delete(
    State(state): State<AppState>,
    FormUser(user): FormUser,
    Path(prompt_id): Path<Uuid>,
) -> FormResult {
    prompts::delete_prompt(&state.db, &user.actor(), prompt_id)
        .await
        .map_err(FormError::at(HOME, HOME))?;
    Ok(status_redirect(HOME, "deleted"))
}

pub async fn toggle_saved(
    State(state): State<AppState>,
    FormUser(user): FormUser,
    Path(prompt_id): Path<Uuid>,
) -> FormResult {
    prompts::toggle_saved(&state.db, &user.actor(), prompt_id)
        .await
        .map_err(FormError::at(HOME, HOME))?;
    Ok(status_redirect(HOME, "saved-toggled"))
}

pub async fn duplicate(
    State(state): State<AppState>,
    FormUser(user): FormUser,
    Path(prompt_id): Path<Uuid>,
    Form(form): Form<DuplicateForm>,
) -> FormResult {
    prompts::duplicate_prompt(&state.db, &user.actor(), prompt_id, form)
        .await
        .map_err(FormError::at(HOME, HOME))?;
    Ok(status_redirect(HOME, "created"))
}

pub async fn restore_version(
    State(state): State<AppState>,
    FormUser(user): FormUser,
    Path((prompt_id, version_id)): Path<(Uuid, Uuid)>,
) -> FormResult {
    prompts::restore_version(&state.db, &user.actor(), prompt_id, version_id)
        .await
        .map_err(FormError::at(format!("/prompts/{}/history", prompt_id), HOME))?;
    Ok(status_redirect(HOME, "updated"))
}
