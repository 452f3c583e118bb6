/// Common test utilities for integration tests
///
/// Every [`TestContext`] migrates a fresh Postgres schema, so tests can run
/// in parallel against one database and still reason about global facts
/// such as "the only admin". Tests are skipped when `DATABASE_URL` is unset.

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use chrono::Utc;
use promptbank_api::app::{build_router, AppState};
use promptbank_api::config::Config;
use promptbank_shared::auth::middleware::{issue_session, SessionUser, SESSION_COOKIE};
use promptbank_shared::auth::password::hash_password;
use promptbank_shared::db::migrations::run_migrations;
use promptbank_shared::models::category::Category;
use promptbank_shared::models::user::{CreateUser, User, UserRole};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "Correct-Horse-42";

const SESSION_SECRET: &str = "integration-test-session-secret-0123456789";

/// Test context: an isolated schema, a router, and helpers to drive it
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
    url: String,
    schema: String,
}

impl TestContext {
    /// Returns `None` (and the test should return early) without a database
    pub async fn new() -> anyhow::Result<Option<Self>> {
        dotenvy::dotenv().ok();
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping database test");
            return Ok(None);
        };

        let schema = format!("test_{}", Uuid::new_v4().simple());
        let admin = PgPool::connect(&url).await?;
        admin.execute(format!("CREATE SCHEMA {}", schema).as_str()).await?;
        admin.close().await;

        let search_path = format!("SET search_path TO {}", schema);
        let db = PgPoolOptions::new()
            .max_connections(5)
            .after_connect(move |conn, _meta| {
                let search_path = search_path.clone();
                Box::pin(async move {
                    conn.execute(search_path.as_str()).await?;
                    Ok(())
                })
            })
            .connect(&url)
            .await?;

        run_migrations(&db).await?;

        let lookup_url = url.clone();
        let config = Config::from_lookup(move |name| match name {
            "DATABASE_URL" => Some(lookup_url.clone()),
            "SESSION_SECRET" => Some(SESSION_SECRET.to_string()),
            _ => None,
        })?;

        let app = build_router(AppState::new(db.clone(), config.clone()));

        Ok(Some(TestContext {
            db,
            app,
            config,
            url,
            schema,
        }))
    }

    /// Drops the schema and everything in it
    pub async fn cleanup(self) -> anyhow::Result<()> {
        self.db.close().await;
        let admin = PgPool::connect(&self.url).await?;
        admin
            .execute(format!("DROP SCHEMA {} CASCADE", self.schema).as_str())
            .await?;
        admin.close().await;
        Ok(())
    }

    pub async fn create_user(&self, role: UserRole) -> anyhow::Result<User> {
        let user = User::create(
            &self.db,
            CreateUser {
                email: format!("{}-{}@example.com", role.as_str().to_lowercase(), Uuid::new_v4().simple()),
                name: None,
                role,
                password_hash: hash_password(PASSWORD)?,
            },
        )
        .await?;
        Ok(user)
    }

    pub async fn create_category(&self, name: &str) -> anyhow::Result<Category> {
        Ok(Category::create(&self.db, name, None).await?)
    }

    /// `Cookie` header value carrying a fresh session for `user`
    pub fn cookie(&self, user: &User) -> String {
        let token = issue_session(&SessionUser::from(user), &self.config.session, Utc::now())
            .expect("issue session");
        format!("{}={}", SESSION_COOKIE, token)
    }

    pub async fn post_form(&self, uri: &str, cookie: Option<&str>, body: &str) -> Response<Body> {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }

        self.app
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }

    pub async fn get_json(&self, uri: &str, cookie: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = self
            .app
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn reload_user(&self, id: Uuid) -> User {
        User::find_by_id(&self.db, id).await.unwrap().expect("user exists")
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.db)
            .await
            .unwrap()
    }
}

/// `Location` header of a redirect, URL-decoded
pub fn location(response: &Response<Body>) -> String {
    let raw = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    urlencoding::decode(raw).map(|s| s.into_owned()).unwrap_or_default()
}

/// Whether the response sets the session cookie
pub fn sets_session(response: &Response<Body>) -> bool {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&format!("{}=", SESSION_COOKIE)) && !v.contains("Max-Age=0"))
}

/// URL-encodes form fields
pub fn form(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
