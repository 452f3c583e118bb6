/// Audit trail
///
/// Append-only log of every mutation and authentication event. Rows carry no
/// foreign keys, so deleting a user or prompt leaves its history intact.
///
/// Metadata is stored as canonical JSON text: top-level keys sorted, capped
/// at [`MAX_METADATA_LENGTH`] characters with a `...[truncated]` suffix.
///
/// # Example
///
/// ```no_run
/// use promptbank_shared::models::audit_log::{AuditAction, AuditLog, NewAuditEntry};
/// use serde_json::json;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, actor: Uuid, prompt: Uuid) {
/// AuditLog::record(
///     &pool,
///     NewAuditEntry::prompt(AuditAction::PromptUpdate, Some(actor), prompt)
///         .with("status", json!("APPROVED")),
/// )
/// .await;
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgExecutor;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;
use uuid::Uuid;

/// Longest metadata string stored before truncation
pub const MAX_METADATA_LENGTH: usize = 2000;

/// Appended to metadata cut at [`MAX_METADATA_LENGTH`]
pub const TRUNCATION_SUFFIX: &str = "...[truncated]";

/// Number of audit rows shown on a prompt's history page
pub const HISTORY_AUDIT_LIMIT: i64 = 30;

/// Metadata keyed in sorted order
pub type AuditMetadata = BTreeMap<String, Value>;

/// Every recorded action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    PromptCreate,
    PromptUpdate,
    PromptDelete,
    PromptToggleSaved,
    PromptDuplicate,
    PromptRestoreVersion,
    CategoryCreate,
    CategoryDelete,
    UserCreate,
    UserRoleUpdate,
    UserPasswordReset,
    UserUnlock,
    UserDelete,
    AuthLoginSuccess,
    AuthLoginFailed,
    AuthLocked,
    AuthLoginBlocked,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::PromptCreate => "prompt.create",
            AuditAction::PromptUpdate => "prompt.update",
            AuditAction::PromptDelete => "prompt.delete",
            AuditAction::PromptToggleSaved => "prompt.toggleSaved",
            AuditAction::PromptDuplicate => "prompt.duplicate",
            AuditAction::PromptRestoreVersion => "prompt.restoreVersion",
            AuditAction::CategoryCreate => "category.create",
            AuditAction::CategoryDelete => "category.delete",
            AuditAction::UserCreate => "user.create",
            AuditAction::UserRoleUpdate => "user.role_update",
            AuditAction::UserPasswordReset => "user.password_reset",
            AuditAction::UserUnlock => "user.unlock",
            AuditAction::UserDelete => "user.delete",
            AuditAction::AuthLoginSuccess => "auth.login_success",
            AuditAction::AuthLoginFailed => "auth.login_failed",
            AuditAction::AuthLocked => "auth.locked",
            AuditAction::AuthLoginBlocked => "auth.login_blocked",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of entity an audit row points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEntity {
    Prompt,
    Category,
    User,
    Auth,
}

impl AuditEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEntity::Prompt => "prompt",
            AuditEntity::Category => "category",
            AuditEntity::User => "user",
            AuditEntity::Auth => "auth",
        }
    }
}

/// Stored audit row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,

    /// Usually a UUID; the submitted email for logins of unknown users
    pub entity_id: String,

    pub prompt_id: Option<Uuid>,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Audit row joined with the actor's email
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditLogEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub log: AuditLog,
    pub actor_email: Option<String>,
}

/// Audit row to be written
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub actor_id: Option<Uuid>,
    pub action: AuditAction,
    pub entity: AuditEntity,
    pub entity_id: String,
    pub prompt_id: Option<Uuid>,
    pub metadata: Option<AuditMetadata>,
}

impl NewAuditEntry {
    pub fn new(action: AuditAction, entity: AuditEntity, entity_id: impl Into<String>) -> Self {
        Self {
            actor_id: None,
            action,
            entity,
            entity_id: entity_id.into(),
            prompt_id: None,
            metadata: None,
        }
    }

    /// Entry about a prompt; `prompt_id` is filled so it shows in history
    pub fn prompt(action: AuditAction, actor_id: Option<Uuid>, prompt_id: Uuid) -> Self {
        Self {
            actor_id,
            prompt_id: Some(prompt_id),
            ..Self::new(action, AuditEntity::Prompt, prompt_id.to_string())
        }
    }

    pub fn actor(mut self, actor_id: Option<Uuid>) -> Self {
        self.actor_id = actor_id;
        self
    }

    /// Adds one metadata key
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(AuditMetadata::new)
            .insert(key.to_string(), value.into());
        self
    }
}

/// Serializes metadata canonically and caps its length
///
/// Length is counted in characters, so truncation never splits a code point.
pub fn sanitize_metadata(metadata: Option<&AuditMetadata>) -> Option<String> {
    let metadata = metadata?;
    let serialized = serde_json::to_string(metadata).ok()?;

    if serialized.chars().count() <= MAX_METADATA_LENGTH {
        return Some(serialized);
    }

    let mut truncated: String = serialized.chars().take(MAX_METADATA_LENGTH).collect();
    truncated.push_str(TRUNCATION_SUFFIX);
    Some(truncated)
}

impl AuditLog {
    /// Inserts an audit row
    pub async fn insert<'e, E>(executor: E, entry: &NewAuditEntry) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (actor_id, action, entity_type, entity_id, prompt_id, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, actor_id, action, entity_type, entity_id, prompt_id, metadata, created_at
            "#,
        )
        .bind(entry.actor_id)
        .bind(entry.action.as_str())
        .bind(entry.entity.as_str())
        .bind(&entry.entity_id)
        .bind(entry.prompt_id)
        .bind(sanitize_metadata(entry.metadata.as_ref()))
        .fetch_one(executor)
        .await
    }

    /// Best-effort insert: failures are logged and swallowed
    pub async fn record<'e, E>(executor: E, entry: NewAuditEntry)
    where
        E: PgExecutor<'e>,
    {
        if let Err(e) = Self::insert(executor, &entry).await {
            warn!(
                error = %e,
                action = %entry.action,
                entity_id = %entry.entity_id,
                "Failed to write audit log"
            );
        }
    }

    /// Most recent entries attached to a prompt, newest first
    pub async fn recent_for_prompt<'e, E>(
        executor: E,
        prompt_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AuditLogEntry>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT a.id, a.actor_id, a.action, a.entity_type, a.entity_id, a.prompt_id,
                   a.metadata, a.created_at, u.email::text AS actor_email
            FROM audit_logs a
            LEFT JOIN users u ON u.id = a.actor_id
            WHERE a.prompt_id = $1
            ORDER BY a.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(prompt_id)
        .bind(limit)
        .fetch_all(executor)
        .await
    }

    /// Entries for one entity, newest first
    pub async fn for_entity<'e, E>(
        executor: E,
        entity: AuditEntity,
        entity_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, actor_id, action, entity_type, entity_id, prompt_id, metadata, created_at
            FROM audit_logs
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(entity.as_str())
        .bind(entity_id)
        .fetch_all(executor)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_metadata_stays_missing() {
        assert_eq!(sanitize_metadata(None), None);
    }

    #[test]
    fn test_metadata_keys_sorted() {
        let entry = NewAuditEntry::new(AuditAction::UserCreate, AuditEntity::User, "u1")
            .with("role", "EDITOR")
            .with("email", "a@example.com");

        assert_eq!(
            sanitize_metadata(entry.metadata.as_ref()).unwrap(),
            r#"{"email":"a@example.com","role":"EDITOR"}"#
        );
    }

    #[test]
    fn test_metadata_null_values_kept() {
        let entry = NewAuditEntry::new(AuditAction::AuthLoginFailed, AuditEntity::Auth, "x")
            .with("lockedUntil", Value::Null)
            .with("failedLogins", 2);

        assert_eq!(
            sanitize_metadata(entry.metadata.as_ref()).unwrap(),
            r#"{"failedLogins":2,"lockedUntil":null}"#
        );
    }

    #[test]
    fn test_metadata_at_limit_not_truncated() {
        // {"k":"…"} adds 8 characters around the value
        let mut metadata = AuditMetadata::new();
        metadata.insert("k".to_string(), json!("a".repeat(MAX_METADATA_LENGTH - 8)));

        let sanitized = sanitize_metadata(Some(&metadata)).unwrap();
        assert_eq!(sanitized.chars().count(), MAX_METADATA_LENGTH);
        assert!(!sanitized.ends_with(TRUNCATION_SUFFIX));
    }

    #[test]
    fn test_long_metadata_truncated() {
        let mut metadata = AuditMetadata::new();
        metadata.insert("k".to_string(), json!("é".repeat(5000)));

        let sanitized = sanitize_metadata(Some(&metadata)).unwrap();
        assert!(sanitized.ends_with(TRUNCATION_SUFFIX));
        assert_eq!(
            sanitized.chars().count(),
            MAX_METADATA_LENGTH + TRUNCATION_SUFFIX.chars().count()
        );
    }

    #[test]
    fn test_prompt_entry_targets_prompt() {
        let prompt_id = Uuid::new_v4();
        let entry = NewAuditEntry::prompt(AuditAction::PromptDelete, None, prompt_id);

        assert_eq!(entry.entity, AuditEntity::Prompt);
        assert_eq!(entry.entity_id, prompt_id.to_string());
        assert_eq!(entry.prompt_id, Some(prompt_id));
    }

    #[test]
    fn test_action_names() {
        assert_eq!(AuditAction::PromptToggleSaved.as_str(), "prompt.toggleSaved");
        assert_eq!(AuditAction::PromptRestoreVersion.as_str(), "prompt.restoreVersion");
        assert_eq!(AuditAction::UserRoleUpdate.as_str(), "user.role_update");
        assert_eq!(AuditAction::AuthLoginBlocked.to_string(), "auth.login_blocked");
    }
}
