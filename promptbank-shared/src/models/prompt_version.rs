/// Prompt version snapshots
///
/// Every successful create, update, duplicate and restore appends one
/// immutable snapshot. Version numbers are assigned by the database as
/// `max(existing) + 1` inside the insert itself, and the
/// `UNIQUE (prompt_id, version)` constraint rejects any pair of writers that
/// race past the prompt row lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use super::prompt::{PromptStatus, PromptVisibility};
use super::tag::TAG_CSV_SEPARATOR;

/// Immutable snapshot of a prompt
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PromptVersion {
    pub id: Uuid,
    pub prompt_id: Uuid,

    /// 1-based, strictly increasing per prompt
    pub version: i32,

    pub title: String,
    pub description: Option<String>,
    pub content: String,

    /// Category at snapshot time; may no longer exist
    pub category_id: Uuid,

    /// Tag names sorted and joined with `", "`
    pub tags_csv: String,

    pub visibility: PromptVisibility,
    pub status: PromptStatus,
    pub changed_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Version row joined with the author's email, for history views
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PromptVersionEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub version: PromptVersion,
    pub changed_by_email: Option<String>,
}

const VERSION_COLUMNS: &str = "id, prompt_id, version, title, description, content, category_id, \
     tags_csv, visibility, status, changed_by_id, created_at";

impl PromptVersion {
    /// Snapshots the prompt's current row and tag set as the next version
    ///
    /// Must run in the same transaction as the change being recorded.
    pub async fn append(
        conn: &mut PgConnection,
        prompt_id: Uuid,
        changed_by: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, PromptVersion>(&format!(
            r#"
            INSERT INTO prompt_versions
                (prompt_id, version, title, description, content, category_id,
                 tags_csv, visibility, status, changed_by_id)
            SELECT p.id,
                   COALESCE((SELECT MAX(v.version) FROM prompt_versions v WHERE v.prompt_id = p.id), 0) + 1,
                   p.title, p.description, p.content, p.category_id,
                   COALESCE((
                       SELECT string_agg(t.name, $3 ORDER BY t.name ASC)
                       FROM prompt_tags pt JOIN tags t ON t.id = pt.tag_id
                       WHERE pt.prompt_id = p.id
                   ), ''),
                   p.visibility, p.status, $2
            FROM prompts p
            WHERE p.id = $1
            RETURNING {}
            "#,
            VERSION_COLUMNS
        ))
        .bind(prompt_id)
        .bind(changed_by)
        .bind(TAG_CSV_SEPARATOR)
        .fetch_one(conn)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, PromptVersion>(&format!(
            "SELECT {} FROM prompt_versions WHERE id = $1",
            VERSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// All versions of a prompt, newest first
    pub async fn list_for_prompt<'e, E>(
        executor: E,
        prompt_id: Uuid,
    ) -> Result<Vec<PromptVersionEntry>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, PromptVersionEntry>(
            r#"
            SELECT v.id, v.prompt_id, v.version, v.title, v.description, v.content,
                   v.category_id, v.tags_csv, v.visibility, v.status, v.changed_by_id,
                   v.created_at, u.email::text AS changed_by_email
            FROM prompt_versions v
            LEFT JOIN users u ON u.id = v.changed_by_id
            WHERE v.prompt_id = $1
            ORDER BY v.version DESC
            "#,
        )
        .bind(prompt_id)
        .fetch_all(executor)
        .await
    }

    /// Tag names recorded in the snapshot
    pub fn tag_names(&self) -> Vec<String> {
        self.tags_csv
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}
