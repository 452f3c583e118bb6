/// Route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Login and logout
/// - `prompts`: Prompt library, history, and prompt mutations
/// - `categories`: Category listing and administration
/// - `users`: User administration
/// - `me`: The signed-in user
///
/// Handlers find the caller through [`CurrentUser`] (JSON reads, 401 when
/// signed out) or [`FormUser`] (form posts, redirect to the login page).

pub mod auth;
pub mod categories;
pub mod health;
pub mod me;
pub mod prompts;
pub mod users;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use promptbank_shared::auth::middleware::SessionUser;

use crate::error::{ApiError, FormError};

fn session_user(parts: &Parts) -> Option<SessionUser> {
    parts.extensions.get::<SessionUser>().cloned()
}

/// Signed-in user for JSON handlers
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionUser);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts)
            .map(CurrentUser)
            .ok_or_else(|| ApiError::Unauthorized("Sign in to continue.".to_string()))
    }
}

/// Signed-in user for form handlers
///
/// A signed-out post redirects to the login page, which then returns to the
/// library.
#[derive(Debug, Clone)]
pub struct FormUser(pub SessionUser);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for FormUser {
    type Rejection = FormError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts)
            .map(FormUser)
            .ok_or_else(|| FormError::login("/"))
    }
}
