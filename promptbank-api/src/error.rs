/// Error handling for the API server
///
/// Two response styles share one set of domain errors:
///
/// - JSON reads return [`ApiError`], which becomes a status code and an
///   [`ErrorResponse`] body.
/// - Form posts return [`FormError`], which becomes a `303 See Other`
///   redirect carrying the message in an `error` query parameter.
///
/// # Example
///
/// ```no_run
/// use axum::Json;
/// use promptbank_api::error::{ApiError, ApiResult};
/// use serde_json::Value;
///
/// async fn handler() -> ApiResult<Json<Value>> {
///     Err(ApiError::NotFound("Prompt not found".to_string()))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use promptbank_shared::services::ServiceError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for form handlers
pub type FormResult = Result<Redirect, FormError>;

/// Error returned by JSON handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unauthorized (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500); the message is logged, never returned
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Service unavailable (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let message = err.user_message();
        match err {
            ServiceError::Forbidden(_) => ApiError::Forbidden(message),
            ServiceError::Validation(_) => ApiError::BadRequest(message),
            ServiceError::NotFound(_) => ApiError::NotFound(message),
            ServiceError::Rejected(_) => ApiError::Conflict(message),
            ServiceError::Failed { .. } => ApiError::InternalError(message),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::InternalError(format!("Database error: {}", err))
    }
}

/// Appends `key=message` to a path, URL-encoding the message
pub fn with_query(path: &str, key: &str, message: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", path, separator, key, urlencoding::encode(message))
}

/// Redirect for a successful form post
pub fn status_redirect(path: &str, status: &str) -> Redirect {
    Redirect::to(&with_query(path, "status", status))
}

/// Error returned by form handlers, answered with a redirect
#[derive(Debug)]
pub enum FormError {
    /// No session; go to the login page and come back afterwards
    Login { callback: String },

    /// The service refused or failed
    ///
    /// Permission errors land on `/`, missing records on `page`, and
    /// everything else back on `form`.
    Service {
        form: String,
        page: &'static str,
        error: ServiceError,
    },
}

impl FormError {
    pub fn login(callback: impl Into<String>) -> Self {
        FormError::Login {
            callback: callback.into(),
        }
    }

    /// Wraps a service error raised while handling the form at `form`
    pub fn at(form: impl Into<String>, page: &'static str) -> impl FnOnce(ServiceError) -> FormError {
        let form = form.into();
        move |error| FormError::Service { form, page, error }
    }

    /// Redirect target including the `error` or `callbackUrl` parameter
    pub fn location(&self) -> String {
        match self {
            FormError::Login { callback } => with_query("/login", "callbackUrl", callback),
            FormError::Service { form, page, error } => {
                let target = match error {
                    ServiceError::Forbidden(_) => "/",
                    ServiceError::NotFound(_) => page,
                    _ => form.as_str(),
                };
                with_query(target, "error", &error.user_message())
            }
        }
    }
}

impl IntoResponse for FormError {
    fn into_response(self) -> Response {
        Redirect::to(&self.location()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptbank_shared::auth::authorization::AuthzError;
    use promptbank_shared::commands::ValidationError;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Prompt not found".to_string());
        assert_eq!(err.to_string(), "Not found: Prompt not found");
    }

    #[test]
    fn test_with_query_encodes() {
        assert_eq!(with_query("/", "status", "created"), "/?status=created");
        assert_eq!(
            with_query("/login?x=1", "error", "Invalid email or password."),
            "/login?x=1&error=Invalid%20email%20or%20password."
        );
    }

    #[test]
    fn test_service_errors_to_status() {
        let cases = [
            (ServiceError::from(AuthzError::ManageUsers), StatusCode::FORBIDDEN),
            (ServiceError::from(ValidationError::new("bad")), StatusCode::BAD_REQUEST),
            (ServiceError::NotFound("User not found."), StatusCode::NOT_FOUND),
            (ServiceError::Rejected("At least one admin user must remain."), StatusCode::CONFLICT),
            (
                ServiceError::Failed {
                    message: "Unable to unlock user.",
                    source: None,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_form_error_targets() {
        let forbidden = FormError::at("/prompts/new", "/")(AuthzError::CreatePrompts.into());
        assert!(forbidden.location().starts_with("/?error=You%20do%20not%20have%20permission"));

        let invalid = FormError::at("/prompts/new", "/")(ValidationError::new("Category is required.").into());
        assert_eq!(invalid.location(), "/prompts/new?error=Category%20is%20required.");

        let missing = FormError::at("/prompts/1/edit", "/")(ServiceError::NotFound("Prompt not found"));
        assert_eq!(missing.location(), "/?error=Prompt%20not%20found");

        let rejected = FormError::at("/users", "/users")(ServiceError::Rejected("You cannot delete your own account."));
        assert_eq!(rejected.location(), "/users?error=You%20cannot%20delete%20your%20own%20account.");
    }

    #[test]
    fn test_login_redirect_keeps_callback() {
        let err = FormError::login("/prompts/new");
        assert_eq!(err.location(), "/login?callbackUrl=%2Fprompts%2Fnew");
        assert_eq!(err.into_response().status(), StatusCode::SEE_OTHER);
    }
}
