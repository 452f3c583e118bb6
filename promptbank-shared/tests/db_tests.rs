/// Integration tests for the pool, migrations, and multi-statement model writes
///
/// These tests require a running PostgreSQL database reachable through
/// `DATABASE_URL`; they are skipped when it is unset. Each test works in
/// its own schema so they can run in parallel.

use promptbank_shared::auth::password::hash_password;
use promptbank_shared::db::migrations::{get_migration_status, run_migrations};
use promptbank_shared::db::pool::{close_pool, create_pool, get_pool_stats, health_check, DatabaseConfig};
use promptbank_shared::models::category::Category;
use promptbank_shared::models::collaborator::PromptCollaborator;
use promptbank_shared::models::prompt::{Prompt, PromptFields, PromptStatus, PromptVisibility};
use promptbank_shared::models::prompt_version::PromptVersion;
use promptbank_shared::models::saved_prompt::SavedPrompt;
use promptbank_shared::models::tag::Tag;
use promptbank_shared::models::user::{CreateUser, User, UserRole};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use uuid::Uuid;

struct Schema {
    url: String,
    name: String,
    pool: PgPool,
}

impl Schema {
    async fn create() -> Option<Self> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping database test");
            return None;
        };

        let name = format!("test_{}", Uuid::new_v4().simple());
        let admin = PgPool::connect(&url).await.expect("connect");
        admin
            .execute(format!("CREATE SCHEMA {}", name).as_str())
            .await
            .expect("create schema");
        admin.close().await;

        let search_path = format!("SET search_path TO {}", name);
        let pool = PgPoolOptions::new()
            .max_connections(3)
            .after_connect(move |conn, _meta| {
                let search_path = search_path.clone();
                Box::pin(async move {
                    conn.execute(search_path.as_str()).await?;
                    Ok(())
                })
            })
            .connect(&url)
            .await
            .expect("connect to schema");

        Some(Schema { url, name, pool })
    }

    async fn migrated() -> Option<Self> {
        let schema = Self::create().await?;
        run_migrations(&schema.pool).await.expect("migrations");
        Some(schema)
    }

    async fn cleanup(self) {
        self.pool.close().await;
        let admin = PgPool::connect(&self.url).await.expect("connect");
        admin
            .execute(format!("DROP SCHEMA {} CASCADE", self.name).as_str())
            .await
            .expect("drop schema");
        admin.close().await;
    }

    async fn user(&self, email: &str, role: UserRole) -> User {
        User::create(
            &self.pool,
            CreateUser {
                email: email.to_string(),
                name: None,
                role,
                password_hash: hash_password("Correct-Horse-42").expect("hash"),
            },
        )
        .await
        .expect("create user")
    }

    async fn prompt(&self, owner: &User) -> Prompt {
        let category = Category::create(&self.pool, &format!("Cat {}", Uuid::new_v4().simple()), None)
            .await
            .expect("create category");

        Prompt::create(
            &self.pool,
            owner.id,
            &PromptFields {
                title: "Release notes".to_string(),
                description: None,
                content: "Summarize the changes".to_string(),
                category_id: category.id,
                visibility: PromptVisibility::Team,
                status: PromptStatus::Draft,
            },
        )
        .await
        .expect("create prompt")
    }
}

#[tokio::test]
async fn test_create_pool_and_health_check() {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        return;
    };

    let pool = create_pool(DatabaseConfig {
        max_connections: 2,
        ..DatabaseConfig::from_url(url)
    })
    .await
    .expect("create pool");

    health_check(&pool).await.expect("health check");
    let stats = get_pool_stats(&pool);
    assert!(stats.total_connections >= 1);
    assert_eq!(stats.active_connections + stats.idle_connections, stats.total_connections);

    close_pool(pool).await;
}

#[tokio::test]
async fn test_create_pool_rejects_bad_url() {
    let result = create_pool(DatabaseConfig {
        acquire_timeout_seconds: 1,
        ..DatabaseConfig::from_url("postgresql://nobody@127.0.0.1:1/missing")
    })
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_migration_status_before_and_after() {
    let Some(schema) = Schema::create().await else { return };

    let before = get_migration_status(&schema.pool).await.expect("status");
    assert_eq!(before.applied_migrations, 0);
    assert_eq!(before.latest_version, None);

    run_migrations(&schema.pool).await.expect("migrations");
    // Applying twice is a no-op
    run_migrations(&schema.pool).await.expect("migrations again");

    let after = get_migration_status(&schema.pool).await.expect("status");
    assert!(after.applied_migrations >= 1);
    assert!(after.latest_version.is_some());

    schema.cleanup().await;
}

#[tokio::test]
async fn test_schema_has_tables_and_enums() {
    let Some(schema) = Schema::migrated().await else { return };

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT table_name::text FROM information_schema.tables WHERE table_schema = current_schema()",
    )
    .fetch_all(&schema.pool)
    .await
    .expect("tables");

    for table in [
        "users",
        "categories",
        "prompts",
        "tags",
        "prompt_tags",
        "prompt_collaborators",
        "prompt_versions",
        "saved_prompts",
        "audit_logs",
    ] {
        assert!(tables.iter().any(|t| t == table), "missing table {}", table);
    }

    let roles: Vec<String> = sqlx::query_scalar(
        "SELECT unnest(enum_range(NULL::user_role))::text",
    )
    .fetch_all(&schema.pool)
    .await
    .expect("roles");
    assert_eq!(roles, vec!["admin", "editor", "viewer"]);

    schema.cleanup().await;
}

#[tokio::test]
async fn test_email_unique() {
    let Some(schema) = Schema::migrated().await else { return };

    schema.user("ada@example.com", UserRole::Editor).await;
    let duplicate = User::create(
        &schema.pool,
        CreateUser {
            email: "ada@example.com".to_string(),
            name: None,
            role: UserRole::Viewer,
            password_hash: "x".to_string(),
        },
    )
    .await;
    assert!(duplicate.is_err());

    schema.cleanup().await;
}

#[tokio::test]
async fn test_collaborator_sync_skips_owner_and_unknown() {
    let Some(schema) = Schema::migrated().await else { return };

    let owner = schema.user("owner@example.com", UserRole::Editor).await;
    let ada = schema.user("ada@example.com", UserRole::Editor).await;
    let bob = schema.user("bob@example.com", UserRole::Viewer).await;
    let prompt = schema.prompt(&owner).await;

    let mut conn = schema.pool.acquire().await.expect("acquire");
    let sync = PromptCollaborator::sync(
        &mut conn,
        prompt.id,
        Some(owner.id),
        &[
            "owner@example.com".to_string(),
            "ada@example.com".to_string(),
            "ghost@example.com".to_string(),
        ],
    )
    .await
    .expect("sync");
    assert_eq!(sync.collaborator_ids, vec![ada.id]);
    assert_eq!(sync.unknown_emails, vec!["ghost@example.com".to_string()]);

    // A second sync replaces the set
    PromptCollaborator::sync(&mut conn, prompt.id, Some(owner.id), &["bob@example.com".to_string()])
        .await
        .expect("resync");
    drop(conn);

    let entries = PromptCollaborator::entries_for_prompt(&schema.pool, prompt.id)
        .await
        .expect("entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].user_id, bob.id);

    schema.cleanup().await;
}

async fn is_saved(schema: &Schema, prompt_id: Uuid, user_id: Uuid) -> bool {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM saved_prompts WHERE prompt_id = $1 AND user_id = $2)")
        .bind(prompt_id)
        .bind(user_id)
        .fetch_one(&schema.pool)
        .await
        .expect("saved lookup")
}

#[tokio::test]
async fn test_saved_toggle_flips() {
    let Some(schema) = Schema::migrated().await else { return };

    let owner = schema.user("owner@example.com", UserRole::Editor).await;
    let prompt = schema.prompt(&owner).await;

    assert!(SavedPrompt::toggle(&schema.pool, prompt.id, owner.id).await.expect("toggle"));
    assert!(is_saved(&schema, prompt.id, owner.id).await);
    assert!(!SavedPrompt::toggle(&schema.pool, prompt.id, owner.id).await.expect("toggle"));
    assert!(!is_saved(&schema, prompt.id, owner.id).await);

    SavedPrompt::set(&schema.pool, prompt.id, owner.id, true).await.expect("set");
    SavedPrompt::set(&schema.pool, prompt.id, owner.id, true).await.expect("set twice");
    assert!(is_saved(&schema, prompt.id, owner.id).await);

    schema.cleanup().await;
}

#[tokio::test]
async fn test_version_append_snapshots_tags() {
    let Some(schema) = Schema::migrated().await else { return };

    let owner = schema.user("owner@example.com", UserRole::Editor).await;
    let prompt = schema.prompt(&owner).await;

    let mut tx = schema.pool.begin().await.expect("begin");
    Tag::replace_for_prompt(&mut tx, prompt.id, &["review".to_string(), "quality".to_string()])
        .await
        .expect("tags");
    let first = PromptVersion::append(&mut tx, prompt.id, Some(owner.id))
        .await
        .expect("append");
    let second = PromptVersion::append(&mut tx, prompt.id, Some(owner.id))
        .await
        .expect("append");
    tx.commit().await.expect("commit");

    assert_eq!(first.version, 1);
    assert_eq!(second.version, 2);
    assert_eq!(first.tag_names(), vec!["quality".to_string(), "review".to_string()]);
    assert_eq!(first.title, "Release notes");

    let history = PromptVersion::list_for_prompt(&schema.pool, prompt.id)
        .await
        .expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].version.version, 2);
    assert_eq!(history[0].changed_by_email.as_deref(), Some("owner@example.com"));

    // Deleting the author keeps the snapshot
    User::delete(&schema.pool, owner.id).await.expect("delete user");
    let history = PromptVersion::list_for_prompt(&schema.pool, prompt.id)
        .await
        .expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].changed_by_email, None);

    schema.cleanup().await;
}
