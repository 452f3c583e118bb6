/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use promptbank_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = promptbank_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use promptbank_shared::auth::middleware::create_session_middleware;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health
/// ├── POST /login, /logout
/// ├── /api/                                  # JSON reads (401 when signed out)
/// │   ├── GET /me
/// │   ├── GET /prompts
/// │   ├── GET /prompts/:id
/// │   ├── GET /prompts/:id/history
/// │   ├── GET /categories
/// │   └── GET /users
/// ├── /prompts                               # Form posts (redirects)
/// │   ├── POST /
/// │   ├── POST /:id
/// │   ├── POST /:id/delete
/// │   ├── POST /:id/save
/// │   ├── POST /:id/duplicate
/// │   └── POST /:id/versions/:version_id/restore
/// ├── /categories
/// │   ├── POST /
/// │   └── POST /:id/delete
/// └── /users
///     ├── POST /
///     ├── POST /:id/role
///     ├── POST /:id/password
///     ├── POST /:id/unlock
///     └── POST /:id/delete
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, tracing, session resolution.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let api_routes = Router::new()
        .route("/me", get(routes::me::me))
        .route("/prompts", get(routes::prompts::list))
        .route("/prompts/:id", get(routes::prompts::detail))
        .route("/prompts/:id/history", get(routes::prompts::history))
        .route("/categories", get(routes::categories::list))
        .route("/users", get(routes::users::list));

    let prompt_routes = Router::new()
        .route("/", post(routes::prompts::create))
        .route("/:id", post(routes::prompts::update))
        .route("/:id/delete", post(routes::prompts::delete))
        .route("/:id/save", post(routes::prompts::toggle_saved))
        .route("/:id/duplicate", post(routes::prompts::duplicate))
        .route(
            "/:id/versions/:version_id/restore",
            post(routes::prompts::restore_version),
        );

    let category_routes = Router::new()
        .route("/", post(routes::categories::create))
        .route("/:id/delete", post(routes::categories::delete));

    let user_routes = Router::new()
        .route("/", post(routes::users::create))
        .route("/:id/role", post(routes::users::update_role))
        .route("/:id/password", post(routes::users::reset_password))
        .route("/:id/unlock", post(routes::users::unlock))
        .route("/:id/delete", post(routes::users::delete));

    let session = axum::middleware::from_fn(create_session_middleware(
        state.db.clone(),
        state.config.session.clone(),
    ));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .nest("/api", api_routes)
        .nest("/prompts", prompt_routes)
        .nest("/categories", category_routes)
        .nest("/users", user_routes)
        .layer(session)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.api.cors_origins))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
