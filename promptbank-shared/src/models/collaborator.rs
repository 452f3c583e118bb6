/// Prompt collaborators
///
/// A collaborator is a non-owner user granted rights on one prompt. The only
/// role today is `EDIT`.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE collaborator_role AS ENUM ('edit');
///
/// CREATE TABLE prompt_collaborators (
///     prompt_id UUID NOT NULL REFERENCES prompts(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role collaborator_role NOT NULL DEFAULT 'edit',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (prompt_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};
use tracing::debug;
use uuid::Uuid;

use super::user::User;

/// Rights a collaborator holds on a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "collaborator_role", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum CollaboratorRole {
    /// May edit and restore, but not delete
    Edit,
}

impl CollaboratorRole {
    /// Whether this role allows editing the prompt
    pub fn can_edit(&self) -> bool {
        matches!(self, CollaboratorRole::Edit)
    }
}

/// Collaborator row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PromptCollaborator {
    pub prompt_id: Uuid,
    pub user_id: Uuid,
    pub role: CollaboratorRole,
    pub created_at: DateTime<Utc>,
}

/// The slice of a collaborator row that authorization needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CollaboratorGrant {
    pub user_id: Uuid,
    pub role: CollaboratorRole,
}

/// Collaborator with the user's email, for display
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CollaboratorEntry {
    pub user_id: Uuid,
    pub email: String,
    pub role: CollaboratorRole,
}

/// Result of reconciling a prompt's collaborators against an email list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollaboratorSync {
    /// User IDs now holding a collaborator row
    pub collaborator_ids: Vec<Uuid>,

    /// Submitted emails with no matching account; dropped, not fatal
    pub unknown_emails: Vec<String>,
}

impl PromptCollaborator {
    /// Grants on a prompt, for authorization checks
    pub async fn grants_for_prompt<'e, E>(
        executor: E,
        prompt_id: Uuid,
    ) -> Result<Vec<CollaboratorGrant>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, CollaboratorGrant>(
            "SELECT user_id, role FROM prompt_collaborators WHERE prompt_id = $1",
        )
        .bind(prompt_id)
        .fetch_all(executor)
        .await
    }

    /// Collaborators with their emails, ordered by email
    pub async fn entries_for_prompt<'e, E>(
        executor: E,
        prompt_id: Uuid,
    ) -> Result<Vec<CollaboratorEntry>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, CollaboratorEntry>(
            r#"
            SELECT pc.user_id, u.email, pc.role
            FROM prompt_collaborators pc
            JOIN users u ON u.id = pc.user_id
            WHERE pc.prompt_id = $1
            ORDER BY u.email ASC
            "#,
        )
        .bind(prompt_id)
        .fetch_all(executor)
        .await
    }

    /// Makes the prompt's collaborators exactly the known users in `emails`
    ///
    /// The owner is never stored as a collaborator. Existing collaborators
    /// not in the list are removed; everyone in the list ends up with `EDIT`.
    pub async fn sync(
        conn: &mut PgConnection,
        prompt_id: Uuid,
        owner_id: Option<Uuid>,
        emails: &[String],
    ) -> Result<CollaboratorSync, sqlx::Error> {
        let users = User::find_ids_by_emails(&mut *conn, emails).await?;
        let sync = reconcile(emails, &users, owner_id);

        sqlx::query("DELETE FROM prompt_collaborators WHERE prompt_id = $1 AND NOT (user_id = ANY($2))")
            .bind(prompt_id)
            .bind(&sync.collaborator_ids)
            .execute(&mut *conn)
            .await?;

        if !sync.collaborator_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO prompt_collaborators (prompt_id, user_id, role)
                SELECT $1, UNNEST($2::uuid[]), 'edit'
                ON CONFLICT (prompt_id, user_id) DO UPDATE SET role = EXCLUDED.role
                "#,
            )
            .bind(prompt_id)
            .bind(&sync.collaborator_ids)
            .execute(&mut *conn)
            .await?;
        }

        debug!(
            %prompt_id,
            collaborators = sync.collaborator_ids.len(),
            unknown = sync.unknown_emails.len(),
            "Collaborators synchronized"
        );

        Ok(sync)
    }
}

/// Splits submitted emails into collaborator IDs and unknown emails
fn reconcile(emails: &[String], known: &[(Uuid, String)], owner_id: Option<Uuid>) -> CollaboratorSync {
    let mut sync = CollaboratorSync::default();

    for email in emails {
        match known.iter().find(|(_, known_email)| known_email == email) {
            Some((id, _)) if Some(*id) == owner_id => {}
            Some((id, _)) => {
                if !sync.collaborator_ids.contains(id) {
                    sync.collaborator_ids.push(*id);
                }
            }
            None => sync.unknown_emails.push(email.clone()),
        }
    }

    sync
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_drops_unknown_and_owner() {
        let owner = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let known = vec![
            (owner, "owner@example.com".to_string()),
            (alice, "alice@example.com".to_string()),
        ];
        let emails = vec![
            "owner@example.com".to_string(),
            "alice@example.com".to_string(),
            "ghost@example.com".to_string(),
        ];

        let sync = reconcile(&emails, &known, Some(owner));

        assert_eq!(sync.collaborator_ids, vec![alice]);
        assert_eq!(sync.unknown_emails, vec!["ghost@example.com".to_string()]);
    }

    #[test]
    fn test_reconcile_empty_list_clears_everyone() {
        let sync = reconcile(&[], &[], Some(Uuid::new_v4()));
        assert!(sync.collaborator_ids.is_empty());
        assert!(sync.unknown_emails.is_empty());
    }

    #[test]
    fn test_reconcile_ownerless_prompt_keeps_everyone_known() {
        let bob = Uuid::new_v4();
        let known = vec![(bob, "bob@example.com".to_string())];
        let sync = reconcile(&["bob@example.com".to_string()], &known, None);
        assert_eq!(sync.collaborator_ids, vec![bob]);
    }

    #[test]
    fn test_edit_role_can_edit() {
        assert!(CollaboratorRole::Edit.can_edit());
    }
}
