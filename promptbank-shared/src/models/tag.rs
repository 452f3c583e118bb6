/// Tag model and the prompt ↔ tag join
///
/// Tag names are stored already normalized (see
/// [`crate::commands::parse_tags`]). A prompt's tag set is always replaced
/// wholesale: the join rows are deleted and re-created, never diffed.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tags (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name TEXT NOT NULL UNIQUE
/// );
///
/// CREATE TABLE prompt_tags (
///     prompt_id UUID NOT NULL REFERENCES prompts(id) ON DELETE CASCADE,
///     tag_id UUID NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
///     PRIMARY KEY (prompt_id, tag_id)
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

/// Separator used when tags are flattened into a version snapshot
pub const TAG_CSV_SEPARATOR: &str = ", ";

/// A tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

impl Tag {
    /// Tag names attached to a prompt, sorted by name
    pub async fn names_for_prompt<'e, E>(executor: E, prompt_id: Uuid) -> Result<Vec<String>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar(
            r#"
            SELECT t.name
            FROM prompt_tags pt
            JOIN tags t ON t.id = pt.tag_id
            WHERE pt.prompt_id = $1
            ORDER BY t.name ASC
            "#,
        )
        .bind(prompt_id)
        .fetch_all(executor)
        .await
    }

    /// Replaces the prompt's tag set with `names`, creating missing tags
    ///
    /// `names` must already be normalized and de-duplicated.
    pub async fn replace_for_prompt(
        conn: &mut PgConnection,
        prompt_id: Uuid,
        names: &[String],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM prompt_tags WHERE prompt_id = $1")
            .bind(prompt_id)
            .execute(&mut *conn)
            .await?;

        if names.is_empty() {
            return Ok(());
        }

        sqlx::query("INSERT INTO tags (name) SELECT UNNEST($1::text[]) ON CONFLICT (name) DO NOTHING")
            .bind(names)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO prompt_tags (prompt_id, tag_id)
            SELECT $1, id FROM tags WHERE name = ANY($2)
            "#,
        )
        .bind(prompt_id)
        .bind(names)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
