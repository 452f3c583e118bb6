/// Login and logout
///
/// # Endpoints
///
/// - `POST /login` - Form login (`email`, `password`, optional `callbackUrl`)
/// - `POST /logout` - Clears the session cookie
///
/// A failed login always answers with the same message, whatever the cause.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use chrono::Utc;
use promptbank_shared::auth::{
    login::{authenticate, LoginError},
    middleware::{clear_session_cookie, issue_session, safe_callback_path, session_cookie, SessionUser},
};
use serde::Deserialize;
use tracing::{error, info};

use crate::{app::AppState, error::with_query};

const SIGN_IN_FAILED: &str = "Unable to sign in. Please try again.";

/// Login form
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub callback_url: Option<String>,
}

fn login_error(callback: &str, message: &str) -> Response {
    let mut location = with_query("/login", "error", message);
    if callback != "/" {
        location = with_query(&location, "callbackUrl", callback);
    }
    Redirect::to(&location).into_response()
}

/// Signs in with email and password
///
/// # Endpoint
///
/// ```text
/// POST /login
/// Content-Type: application/x-www-form-urlencoded
///
/// email=editor%40example.com&password=...&callbackUrl=%2Fprompts%2Fnew
/// ```
///
/// On success the session cookie is set and the browser is sent to the
/// (sanitized) callback path.
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let callback = safe_callback_path(form.callback_url.as_deref());
    let now = Utc::now();

    let user = match authenticate(&state.db, &form.email, &form.password, now).await {
        Ok(user) => user,
        Err(err @ LoginError::InvalidCredentials) => return login_error(&callback, &err.to_string()),
        Err(LoginError::Database(e)) => {
            error!(error = %e, "Login failed on database error");
            return login_error(&callback, SIGN_IN_FAILED);
        }
    };

    let session_user = SessionUser::from(&user);
    let token = match issue_session(&session_user, &state.config.session, now) {
        Ok(token) => token,
        Err(e) => {
            error!(user_id = %user.id, error = %e, "Failed to issue session");
            return login_error(&callback, SIGN_IN_FAILED);
        }
    };

    info!(user_id = %user.id, role = %user.role, "User signed in");

    (
        [(
            header::SET_COOKIE,
            session_cookie(&token, state.config.session.secure_cookies),
        )],
        Redirect::to(&callback),
    )
        .into_response()
}

/// Signs out
pub async fn logout(State(state): State<AppState>) -> Response {
    (
        [(
            header::SET_COOKIE,
            clear_session_cookie(state.config.session.secure_cookies),
        )],
        Redirect::to("/login"),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    #[test]
    fn test_login_error_keeps_non_default_callback() {
        let response = login_error("/prompts/new", "Invalid email or password.");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            "/login?error=Invalid%20email%20or%20password.&callbackUrl=%2Fprompts%2Fnew"
        );
    }

    #[test]
    fn test_login_error_omits_root_callback() {
        let response = login_error("/", "Invalid email or password.");
        assert_eq!(location(&response), "/login?error=Invalid%20email%20or%20password.");
    }
}
