/// The signed-in user
///
/// `GET /api/me` returns the session user and what their role allows.

use axum::Json;
use promptbank_shared::auth::authorization::{can_create_prompt, can_manage_categories, can_manage_users};
use promptbank_shared::auth::middleware::SessionUser;
use serde::Serialize;

use super::CurrentUser;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: SessionUser,
    pub can_create_prompts: bool,
    pub can_manage_categories: bool,
    pub can_manage_users: bool,
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<MeResponse> {
    Json(MeResponse {
        can_create_prompts: can_create_prompt(user.role),
        can_manage_categories: can_manage_categories(user.role),
        can_manage_users: can_manage_users(user.role),
        user,
    })
}
