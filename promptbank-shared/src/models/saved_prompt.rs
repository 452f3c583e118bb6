/// Personal bookmarks
///
/// A saved prompt is a `(prompt_id, user_id)` pair. Bookmarks vanish with
/// either side.

use sqlx::PgExecutor;
use uuid::Uuid;

/// Bookmark operations; the table has no payload beyond the key
pub struct SavedPrompt;

impl SavedPrompt {
    /// Bookmarks the prompt; a no-op if already saved
    pub async fn save<'e, E>(executor: E, prompt_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO saved_prompts (prompt_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (prompt_id, user_id) DO NOTHING
            "#,
        )
        .bind(prompt_id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Removes the bookmark; a no-op if not saved
    pub async fn unsave<'e, E>(executor: E, prompt_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query("DELETE FROM saved_prompts WHERE prompt_id = $1 AND user_id = $2")
            .bind(prompt_id)
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Saves or unsaves to match `saved`
    pub async fn set<'e, E>(
        executor: E,
        prompt_id: Uuid,
        user_id: Uuid,
        saved: bool,
    ) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        if saved {
            Self::save(executor, prompt_id, user_id).await
        } else {
            Self::unsave(executor, prompt_id, user_id).await
        }
    }

    /// Flips the bookmark and returns the new state
    pub async fn toggle<'e, E>(executor: E, prompt_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        // A data-modifying CTE keeps the check and the flip in one statement.
        sqlx::query_scalar(
            r#"
            WITH removed AS (
                DELETE FROM saved_prompts WHERE prompt_id = $1 AND user_id = $2
                RETURNING prompt_id
            ), added AS (
                INSERT INTO saved_prompts (prompt_id, user_id)
                SELECT $1, $2 WHERE NOT EXISTS (SELECT 1 FROM removed)
                ON CONFLICT (prompt_id, user_id) DO NOTHING
                RETURNING prompt_id
            )
            SELECT EXISTS (SELECT 1 FROM added)
            "#,
        )
        .bind(prompt_id)
        .bind(user_id)
        .fetch_one(executor)
        .await
    }
}
