/// Prompt model
///
/// A prompt is a reusable block of text filed under one category, optionally
/// tagged, shared with the team or kept private, and moved through a simple
/// draft/approved/archived lifecycle.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE prompts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(120) NOT NULL,
///     description VARCHAR(300),
///     content TEXT NOT NULL,
///     category_id UUID NOT NULL REFERENCES categories(id) ON DELETE RESTRICT,
///     owner_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     visibility prompt_visibility NOT NULL DEFAULT 'team',
///     status prompt_status NOT NULL DEFAULT 'draft',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Listing
///
/// [`Prompt::list`] builds its `WHERE` clause dynamically from a
/// [`PromptListFilter`]. Non-admin viewers only ever see team prompts plus
/// the ones they own or collaborate on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, Postgres, QueryBuilder};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Who can see a prompt beyond its owner and collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "prompt_visibility", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum PromptVisibility {
    /// Every signed-in user
    Team,
    /// Owner, collaborators and admins only
    Private,
}

impl PromptVisibility {
    pub const ALL: [PromptVisibility; 2] = [PromptVisibility::Team, PromptVisibility::Private];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptVisibility::Team => "TEAM",
            PromptVisibility::Private => "PRIVATE",
        }
    }
}

impl fmt::Display for PromptVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptVisibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TEAM" => Ok(PromptVisibility::Team),
            "PRIVATE" => Ok(PromptVisibility::Private),
            other => Err(format!("Invalid visibility: {}", other)),
        }
    }
}

/// Lifecycle state of a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "prompt_status", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum PromptStatus {
    Draft,
    Approved,
    Archived,
}

impl PromptStatus {
    pub const ALL: [PromptStatus; 3] = [
        PromptStatus::Draft,
        PromptStatus::Approved,
        PromptStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptStatus::Draft => "DRAFT",
            PromptStatus::Approved => "APPROVED",
            PromptStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for PromptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(PromptStatus::Draft),
            "APPROVED" => Ok(PromptStatus::Approved),
            "ARCHIVED" => Ok(PromptStatus::Archived),
            other => Err(format!("Invalid status: {}", other)),
        }
    }
}

/// Prompt row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Prompt {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub category_id: Uuid,

    /// `None` once the owning user has been deleted
    pub owner_id: Option<Uuid>,

    pub visibility: PromptVisibility,
    pub status: PromptStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable fields of a prompt, already validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptFields {
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub category_id: Uuid,
    pub visibility: PromptVisibility,
    pub status: PromptStatus,
}

/// Filters for [`Prompt::list`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptListFilter {
    /// Free text matched against title, description, content, category and tags
    pub query: Option<String>,
    pub category_id: Option<Uuid>,
    pub status: Option<PromptStatus>,
    pub visibility: Option<PromptVisibility>,

    /// Only prompts owned by the viewer
    pub mine_only: bool,

    /// Only prompts the viewer has bookmarked
    pub saved_only: bool,
}

/// Listing row, one per visible prompt
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PromptSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub category_id: Uuid,
    pub category_name: String,
    pub owner_id: Option<Uuid>,
    pub owner_email: Option<String>,
    pub visibility: PromptVisibility,
    pub status: PromptStatus,
    pub tags: Vec<String>,
    pub collaborator_emails: Vec<String>,
    pub is_saved: bool,
    pub latest_version: Option<i32>,
    pub latest_changed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const PROMPT_COLUMNS: &str =
    "id, title, description, content, category_id, owner_id, visibility, status, created_at, updated_at";

/// Escapes `LIKE` wildcards so user input only ever matches literally
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

impl Prompt {
    /// Inserts a prompt owned by `owner_id`
    pub async fn create<'e, E>(
        executor: E,
        owner_id: Uuid,
        fields: &PromptFields,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Prompt>(&format!(
            r#"
            INSERT INTO prompts (title, description, content, category_id, owner_id, visibility, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            PROMPT_COLUMNS
        ))
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.content)
        .bind(fields.category_id)
        .bind(owner_id)
        .bind(fields.visibility)
        .bind(fields.status)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Prompt>(&format!("SELECT {} FROM prompts WHERE id = $1", PROMPT_COLUMNS))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Loads the prompt and holds a row lock until the transaction ends
    pub async fn lock_for_update(conn: &mut PgConnection, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Prompt>(&format!(
            "SELECT {} FROM prompts WHERE id = $1 FOR UPDATE",
            PROMPT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Overwrites the editable fields and bumps `updated_at`
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        fields: &PromptFields,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Prompt>(&format!(
            r#"
            UPDATE prompts
            SET title = $2, description = $3, content = $4, category_id = $5,
                visibility = $6, status = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROMPT_COLUMNS
        ))
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.content)
        .bind(fields.category_id)
        .bind(fields.visibility)
        .bind(fields.status)
        .fetch_optional(executor)
        .await
    }

    /// Deletes the prompt; versions, tags, collaborators and bookmarks cascade
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM prompts WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Prompts visible to the viewer, newest activity first
    ///
    /// `viewer_is_admin` lifts the team/owner/collaborator restriction.
    pub async fn list<'e, E>(
        executor: E,
        viewer_id: Uuid,
        viewer_is_admin: bool,
        filter: &PromptListFilter,
    ) -> Result<Vec<PromptSummary>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut builder = summary_query(viewer_id);
        builder.push(" WHERE TRUE");

        if !viewer_is_admin {
            builder
                .push(" AND (p.visibility = 'team' OR p.owner_id = ")
                .push_bind(viewer_id)
                .push(" OR EXISTS (SELECT 1 FROM prompt_collaborators pc WHERE pc.prompt_id = p.id AND pc.user_id = ")
                .push_bind(viewer_id)
                .push("))");
        }

        if let Some(category_id) = filter.category_id {
            builder.push(" AND p.category_id = ").push_bind(category_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND p.status = ").push_bind(status);
        }
        if let Some(visibility) = filter.visibility {
            builder.push(" AND p.visibility = ").push_bind(visibility);
        }
        if filter.mine_only {
            builder.push(" AND p.owner_id = ").push_bind(viewer_id);
        }
        if filter.saved_only {
            builder
                .push(" AND EXISTS (SELECT 1 FROM saved_prompts s WHERE s.prompt_id = p.id AND s.user_id = ")
                .push_bind(viewer_id)
                .push(")");
        }

        if let Some(query) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = like_pattern(query);
            builder
                .push(" AND (p.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.content ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR EXISTS (SELECT 1 FROM prompt_tags qt JOIN tags t ON t.id = qt.tag_id WHERE qt.prompt_id = p.id AND t.name ILIKE ")
                .push_bind(pattern)
                .push("))");
        }

        builder.push(" ORDER BY p.updated_at DESC, p.created_at DESC");

        builder
            .build_query_as::<PromptSummary>()
            .fetch_all(executor)
            .await
    }

    /// One prompt in listing shape, regardless of visibility
    ///
    /// Callers are expected to authorize the viewer separately.
    pub async fn summary<'e, E>(
        executor: E,
        id: Uuid,
        viewer_id: Uuid,
    ) -> Result<Option<PromptSummary>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut builder = summary_query(viewer_id);
        builder.push(" WHERE p.id = ").push_bind(id);

        builder
            .build_query_as::<PromptSummary>()
            .fetch_optional(executor)
            .await
    }
}

/// `SELECT ... FROM ...` shared by the listing and detail queries
fn summary_query<'a>(viewer_id: Uuid) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new(
        r#"
        SELECT p.id, p.title, p.description, p.content, p.category_id,
               c.name::text AS category_name,
               p.owner_id, o.email::text AS owner_email,
               p.visibility, p.status,
               ARRAY(
                   SELECT t.name::text FROM prompt_tags pt JOIN tags t ON t.id = pt.tag_id
                   WHERE pt.prompt_id = p.id ORDER BY t.name ASC
               ) AS tags,
               ARRAY(
                   SELECT u.email::text FROM prompt_collaborators pc JOIN users u ON u.id = pc.user_id
                   WHERE pc.prompt_id = p.id ORDER BY u.email ASC
               ) AS collaborator_emails,
               EXISTS (
                   SELECT 1 FROM saved_prompts sp WHERE sp.prompt_id = p.id AND sp.user_id = "#,
    );
    builder.push_bind(viewer_id).push(
        r#"
               ) AS is_saved,
               lv.version AS latest_version,
               lu.email::text AS latest_changed_by,
               p.created_at, p.updated_at
        FROM prompts p
        JOIN categories c ON c.id = p.category_id
        LEFT JOIN users o ON o.id = p.owner_id
        LEFT JOIN LATERAL (
            SELECT v.version, v.changed_by_id FROM prompt_versions v
            WHERE v.prompt_id = p.id ORDER BY v.version DESC LIMIT 1
        ) lv ON TRUE
        LEFT JOIN users lu ON lu.id = lv.changed_by_id"#,
    );
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_parsing() {
        assert_eq!("team".parse::<PromptVisibility>().unwrap(), PromptVisibility::Team);
        assert_eq!(" PRIVATE ".parse::<PromptVisibility>().unwrap(), PromptVisibility::Private);
        assert!("public".parse::<PromptVisibility>().is_err());
    }

    #[test]
    fn test_status_parsing() {
        for status in PromptStatus::ALL {
            assert_eq!(status.as_str().parse::<PromptStatus>().unwrap(), status);
        }
        assert!("published".parse::<PromptStatus>().is_err());
    }

    #[test]
    fn test_enums_serialize_uppercase() {
        assert_eq!(serde_json::to_string(&PromptVisibility::Team).unwrap(), "\"TEAM\"");
        assert_eq!(serde_json::to_string(&PromptStatus::Archived).unwrap(), "\"ARCHIVED\"");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("email"), "%email%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_summary_query_selects_from_prompts() {
        let builder = summary_query(Uuid::new_v4());
        let sql = builder.sql();
        assert!(sql.contains("FROM prompts p"));
        assert!(sql.contains("AS is_saved"));
        assert!(sql.contains("$1"));
    }
}
