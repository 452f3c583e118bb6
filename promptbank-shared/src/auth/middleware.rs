/// Session middleware for Axum
///
/// Resolves the caller's session from the `pb_session` cookie or an
/// `Authorization: Bearer` header, reloads the user, and stores a
/// [`SessionUser`] in the request extensions. Requests without a valid
/// session pass through untouched; handlers decide whether to redirect to
/// the login page or answer 401.
///
/// Tokens older than thirty minutes are reissued and the fresh token is set
/// as a cookie on the response.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use promptbank_shared::auth::middleware::{create_session_middleware, SessionConfig};
/// use sqlx::PgPool;
///
/// # fn example(pool: PgPool) {
/// let config = SessionConfig {
///     secret: "a-session-secret-of-at-least-32-bytes!".to_string(),
///     secure_cookies: true,
/// };
///
/// let app: Router = Router::new()
///     .route("/api/me", get(|| async { "me" }))
///     .layer(middleware::from_fn(create_session_middleware(pool, config)));
/// # }
/// ```

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, error};
use uuid::Uuid;

use super::authorization::Actor;
use super::session::{issue_token, validate_token, SessionClaims, SESSION_TTL_SECONDS};
use crate::models::user::{User, UserRole};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "pb_session";

/// Signing secret and cookie flags for sessions
#[derive(Clone)]
pub struct SessionConfig {
    pub secret: String,

    /// Adds `Secure` to session cookies
    pub secure_cookies: bool,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"[redacted]")
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

/// The signed-in user, as stored in request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
}

impl SessionUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

/// Reads the session token, preferring a bearer header over the cookie
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, SESSION_TTL_SECONDS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Local path to return to after login
///
/// Anything that is not a plain local path, or that points back at the
/// login page, becomes `/`.
pub fn safe_callback_path(path: Option<&str>) -> String {
    match path {
        Some(p) if p.starts_with('/') && !p.starts_with("//") && !p.starts_with("/login") => {
            p.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Issues a fresh session token for a user
pub fn issue_session(
    user: &SessionUser,
    config: &SessionConfig,
    now: DateTime<Utc>,
) -> Result<String, super::session::SessionError> {
    issue_token(
        &SessionClaims::new(user.id, &user.email, user.role, now),
        &config.secret,
    )
}

/// Validates a token and reloads its user
///
/// `Ok(None)` covers bad tokens and users that no longer exist.
pub async fn resolve_session(
    pool: &PgPool,
    config: &SessionConfig,
    token: &str,
) -> Result<Option<(SessionUser, SessionClaims)>, sqlx::Error> {
    let claims = match validate_token(token, &config.secret) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "Ignoring invalid session token");
            return Ok(None);
        }
    };

    let user = User::find_by_id(pool, claims.sub).await?;
    Ok(user.map(|u| (SessionUser::from(&u), claims)))
}

fn sets_session_cookie(response: &Response) -> bool {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&format!("{}=", SESSION_COOKIE)))
}

/// Attaches the session user, if any, and renews stale tokens
pub async fn session_middleware(
    pool: PgPool,
    config: SessionConfig,
    mut req: Request,
    next: Next,
) -> Response {
    let now = Utc::now();
    let mut renewed = None;

    if let Some(token) = extract_token(req.headers()) {
        match resolve_session(&pool, &config, &token).await {
            Ok(Some((user, claims))) => {
                if claims.should_renew(now) {
                    renewed = issue_session(&user, &config, now).ok();
                }
                req.extensions_mut().insert(user);
            }
            Ok(None) => {}
            Err(e) => error!(error = %e, "Failed to load session user"),
        }
    }

    let mut response = next.run(req).await;

    if let Some(token) = renewed {
        if !sets_session_cookie(&response) {
            if let Ok(value) = HeaderValue::from_str(&session_cookie(&token, config.secure_cookies)) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
    }

    response
}

/// Wraps [`session_middleware`] for `axum::middleware::from_fn`
pub fn create_session_middleware(
    pool: PgPool,
    config: SessionConfig,
) -> impl Fn(Request, Next) -> std::pin::Pin<Box<dyn std::future::Future<Output = Response> + Send>> + Clone {
    move |req, next| {
        let pool = pool.clone();
        let config = config.clone();
        Box::pin(session_middleware(pool, config, req, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let map = headers(&[(header::COOKIE, "theme=dark; pb_session=abc.def.ghi; other=1")]);
        assert_eq!(extract_token(&map), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_extract_token_prefers_bearer() {
        let map = headers(&[
            (header::AUTHORIZATION, "Bearer from-header"),
            (header::COOKIE, "pb_session=from-cookie"),
        ]);
        assert_eq!(extract_token(&map), Some("from-header".to_string()));
    }

    #[test]
    fn test_extract_token_missing() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
        assert_eq!(extract_token(&headers(&[(header::COOKIE, "pb_session=")])), None);
        assert_eq!(extract_token(&headers(&[(header::AUTHORIZATION, "Basic abc")])), None);
    }

    #[test]
    fn test_session_cookie_flags() {
        let cookie = session_cookie("tok", false);
        assert!(cookie.starts_with("pb_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=28800"));
        assert!(!cookie.contains("Secure"));

        assert!(session_cookie("tok", true).ends_with("; Secure"));
        assert!(clear_session_cookie(false).contains("Max-Age=0"));
    }

    #[test]
    fn test_safe_callback_path() {
        assert_eq!(safe_callback_path(None), "/");
        assert_eq!(safe_callback_path(Some("")), "/");
        assert_eq!(safe_callback_path(Some("/prompts/new")), "/prompts/new");
        assert_eq!(safe_callback_path(Some("/users?status=created")), "/users?status=created");
        assert_eq!(safe_callback_path(Some("//evil.example.com")), "/");
        assert_eq!(safe_callback_path(Some("https://evil.example.com")), "/");
        assert_eq!(safe_callback_path(Some("/login")), "/");
        assert_eq!(safe_callback_path(Some("/login?callbackUrl=/")), "/");
    }

    #[test]
    fn test_session_user_actor() {
        let user = SessionUser {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            name: None,
            role: UserRole::Editor,
        };
        assert_eq!(user.actor(), Actor::new(user.id, UserRole::Editor));
    }

    #[test]
    fn test_session_config_debug_redacts_secret() {
        let config = SessionConfig {
            secret: "super-secret".to_string(),
            secure_cookies: false,
        };
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
