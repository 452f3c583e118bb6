/// Prompt workflows
///
/// Create, update, duplicate and restore share one shape:
///
/// 1. authorize the actor
/// 2. validate the form
/// 3. inside a transaction: check the category, write the prompt row,
///    replace tags, reconcile collaborators, append a version snapshot and
///    set the actor's bookmark
/// 4. after commit: append the audit entry
///
/// Update and restore lock the prompt row (`FOR UPDATE`) so concurrent
/// edits of the same prompt apply one after the other.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use super::{read_failed, ServiceError, StepError};
use crate::auth::authorization::{
    can_create_prompt, can_delete, can_edit, can_view, require_create_prompt, require_delete,
    require_edit, require_view, Actor, AuthzError, PromptAccess,
};
use crate::commands::prompt::{duplicate_title, DuplicateForm, PromptCommand, PromptForm};
use crate::models::audit_log::{
    AuditAction, AuditEntity, AuditLog, AuditLogEntry, NewAuditEntry, HISTORY_AUDIT_LIMIT,
};
use crate::models::category::Category;
use crate::models::collaborator::{CollaboratorEntry, CollaboratorGrant, PromptCollaborator};
use crate::models::prompt::{Prompt, PromptFields, PromptListFilter, PromptStatus, PromptSummary};
use crate::models::prompt_version::{PromptVersion, PromptVersionEntry};
use crate::models::saved_prompt::SavedPrompt;
use crate::models::tag::Tag;

pub const PROMPT_NOT_FOUND: &str = "Prompt not found";
pub const VERSION_NOT_FOUND: &str = "Version not found.";
pub const CREATE_FAILED: &str = "Unable to create prompt. Please try again.";
pub const UPDATE_FAILED: &str = "Unable to update prompt. Please try again.";
pub const DELETE_FAILED: &str = "Unable to delete prompt. It may no longer exist.";
pub const SAVE_FAILED: &str = "Unable to update saved state. Please try again.";
pub const DUPLICATE_FAILED: &str = "Unable to duplicate prompt. Please try again.";
pub const RESTORE_FAILED: &str = "Unable to restore this version.";
pub const LOAD_FAILED: &str = "Unable to load prompts.";

/// Result of a write that produced a new version
#[derive(Debug, Clone, Serialize)]
pub struct PromptWrite {
    pub prompt_id: Uuid,
    pub version: i32,

    /// Collaborator emails with no account; they were ignored
    pub unknown_collaborators: Vec<String>,
}

/// What the viewer may do with a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PromptPermissions {
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_duplicate: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptDetail {
    #[serde(flatten)]
    pub prompt: PromptSummary,
    pub collaborators: Vec<CollaboratorEntry>,
    pub permissions: PromptPermissions,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptHistory {
    pub prompt: PromptSummary,
    pub versions: Vec<PromptVersionEntry>,
    pub audit: Vec<AuditLogEntry>,
}

/// Loads a prompt with its collaborator grants
async fn load_with_grants(
    pool: &PgPool,
    prompt_id: Uuid,
) -> Result<Option<(Prompt, Vec<CollaboratorGrant>)>, sqlx::Error> {
    let Some(prompt) = Prompt::find_by_id(pool, prompt_id).await? else {
        return Ok(None);
    };
    let grants = PromptCollaborator::grants_for_prompt(pool, prompt_id).await?;
    Ok(Some((prompt, grants)))
}

async fn require_category(conn: &mut PgConnection, category_id: Option<Uuid>) -> Result<Uuid, StepError> {
    match category_id {
        Some(id) if Category::exists(&mut *conn, id).await? => Ok(id),
        _ => Err(StepError::Missing("category")),
    }
}

fn write_entry(action: AuditAction, actor: &Actor, cmd: &PromptCommand, prompt_id: Uuid) -> NewAuditEntry {
    NewAuditEntry::prompt(action, Some(actor.id), prompt_id)
        .with("visibility", cmd.visibility.as_str())
        .with("status", cmd.status.as_str())
        .with("collaboratorCount", cmd.collaborator_emails.len())
}

/// Creates a prompt owned by the actor
pub async fn create_prompt(pool: &PgPool, actor: &Actor, form: PromptForm) -> Result<PromptWrite, ServiceError> {
    require_create_prompt(actor)?;
    let cmd = form.into_command()?;

    let write = apply_create(pool, actor, &cmd)
        .await
        .map_err(|e| e.fail("prompt.create", CREATE_FAILED))?;

    AuditLog::record(pool, write_entry(AuditAction::PromptCreate, actor, &cmd, write.prompt_id)).await;
    info!(prompt_id = %write.prompt_id, actor_id = %actor.id, "Prompt created");

    Ok(write)
}

async fn apply_create(pool: &PgPool, actor: &Actor, cmd: &PromptCommand) -> Result<PromptWrite, StepError> {
    let mut tx = pool.begin().await?;

    let category_id = require_category(&mut tx, cmd.category_id).await?;
    let prompt = Prompt::create(&mut *tx, actor.id, &cmd.fields(category_id)).await?;
    Tag::replace_for_prompt(&mut tx, prompt.id, &cmd.tags).await?;
    let sync = PromptCollaborator::sync(&mut tx, prompt.id, Some(actor.id), &cmd.collaborator_emails).await?;
    let version = PromptVersion::append(&mut tx, prompt.id, Some(actor.id)).await?;
    if cmd.is_saved {
        SavedPrompt::save(&mut *tx, prompt.id, actor.id).await?;
    }

    tx.commit().await?;

    Ok(PromptWrite {
        prompt_id: prompt.id,
        version: version.version,
        unknown_collaborators: sync.unknown_emails,
    })
}

/// Replaces a prompt's fields, tags and collaborators
pub async fn update_prompt(
    pool: &PgPool,
    actor: &Actor,
    prompt_id: Uuid,
    form: PromptForm,
) -> Result<PromptWrite, ServiceError> {
    let (prompt, grants) = load_with_grants(pool, prompt_id)
        .await
        .map_err(read_failed("prompt.update", UPDATE_FAILED))?
        .ok_or(ServiceError::NotFound(PROMPT_NOT_FOUND))?;
    require_edit(actor, &PromptAccess::of(&prompt, &grants), AuthzError::UpdatePrompt)?;

    let cmd = form.into_command()?;

    let write = apply_update(pool, actor, prompt_id, &cmd)
        .await
        .map_err(|e| e.fail("prompt.update", UPDATE_FAILED))?;

    AuditLog::record(pool, write_entry(AuditAction::PromptUpdate, actor, &cmd, prompt_id)).await;
    info!(%prompt_id, actor_id = %actor.id, version = write.version, "Prompt updated");

    Ok(write)
}

async fn apply_update(
    pool: &PgPool,
    actor: &Actor,
    prompt_id: Uuid,
    cmd: &PromptCommand,
) -> Result<PromptWrite, StepError> {
    let mut tx = pool.begin().await?;

    let prompt = Prompt::lock_for_update(&mut tx, prompt_id)
        .await?
        .ok_or(StepError::Missing("prompt"))?;
    let category_id = require_category(&mut tx, cmd.category_id).await?;

    Prompt::update(&mut *tx, prompt_id, &cmd.fields(category_id)).await?;
    Tag::replace_for_prompt(&mut tx, prompt_id, &cmd.tags).await?;

    // An ownerless prompt treats the editor as owner for collaborator purposes
    let owner_id = prompt.owner_id.or(Some(actor.id));
    let sync = PromptCollaborator::sync(&mut tx, prompt_id, owner_id, &cmd.collaborator_emails).await?;

    let version = PromptVersion::append(&mut tx, prompt_id, Some(actor.id)).await?;
    SavedPrompt::set(&mut *tx, prompt_id, actor.id, cmd.is_saved).await?;

    tx.commit().await?;

    Ok(PromptWrite {
        prompt_id,
        version: version.version,
        unknown_collaborators: sync.unknown_emails,
    })
}

/// Deletes a prompt and everything hanging off it
pub async fn delete_prompt(pool: &PgPool, actor: &Actor, prompt_id: Uuid) -> Result<(), ServiceError> {
    let prompt = Prompt::find_by_id(pool, prompt_id)
        .await
        .map_err(read_failed("prompt.delete", DELETE_FAILED))?
        .ok_or(ServiceError::NotFound(PROMPT_NOT_FOUND))?;
    require_delete(actor, &PromptAccess::of(&prompt, &[]))?;

    let deleted = Prompt::delete(pool, prompt_id)
        .await
        .map_err(|e| StepError::from(e).fail("prompt.delete", DELETE_FAILED))?;
    if !deleted {
        return Err(StepError::Missing("prompt").fail("prompt.delete", DELETE_FAILED));
    }

    AuditLog::record(
        pool,
        NewAuditEntry::new(AuditAction::PromptDelete, AuditEntity::Prompt, prompt_id.to_string())
            .actor(Some(actor.id)),
    )
    .await;
    info!(%prompt_id, actor_id = %actor.id, "Prompt deleted");

    Ok(())
}

/// Flips the actor's bookmark; returns whether the prompt is now saved
///
/// Prompts the actor cannot see are reported as missing.
pub async fn toggle_saved(pool: &PgPool, actor: &Actor, prompt_id: Uuid) -> Result<bool, ServiceError> {
    let (prompt, grants) = load_with_grants(pool, prompt_id)
        .await
        .map_err(read_failed("prompt.toggleSaved", SAVE_FAILED))?
        .ok_or(ServiceError::NotFound(PROMPT_NOT_FOUND))?;
    if !can_view(actor, &PromptAccess::of(&prompt, &grants)) {
        return Err(ServiceError::NotFound(PROMPT_NOT_FOUND));
    }

    let saved = SavedPrompt::toggle(pool, prompt_id, actor.id)
        .await
        .map_err(|e| StepError::from(e).fail("prompt.toggleSaved", SAVE_FAILED))?;

    AuditLog::record(
        pool,
        NewAuditEntry::prompt(AuditAction::PromptToggleSaved, Some(actor.id), prompt_id),
    )
    .await;

    Ok(saved)
}

/// Copies a visible prompt into a new draft owned by the actor
pub async fn duplicate_prompt(
    pool: &PgPool,
    actor: &Actor,
    source_id: Uuid,
    form: DuplicateForm,
) -> Result<PromptWrite, ServiceError> {
    if !can_create_prompt(actor.role) {
        return Err(AuthzError::DuplicatePrompts.into());
    }

    let (source, grants) = load_with_grants(pool, source_id)
        .await
        .map_err(read_failed("prompt.duplicate", DUPLICATE_FAILED))?
        .ok_or(ServiceError::NotFound(PROMPT_NOT_FOUND))?;
    require_view(actor, &PromptAccess::of(&source, &grants), AuthzError::DuplicatePrompt)?;

    let fields = PromptFields {
        title: duplicate_title(&source.title, form.duplicate_title.as_deref()),
        description: source.description.clone(),
        content: source.content.clone(),
        category_id: source.category_id,
        visibility: source.visibility,
        status: PromptStatus::Draft,
    };

    let write = apply_duplicate(pool, actor, source_id, &fields)
        .await
        .map_err(|e| e.fail("prompt.duplicate", DUPLICATE_FAILED))?;

    AuditLog::record(
        pool,
        NewAuditEntry::prompt(AuditAction::PromptDuplicate, Some(actor.id), write.prompt_id)
            .with("sourcePromptId", source_id.to_string()),
    )
    .await;
    info!(%source_id, prompt_id = %write.prompt_id, actor_id = %actor.id, "Prompt duplicated");

    Ok(write)
}

async fn apply_duplicate(
    pool: &PgPool,
    actor: &Actor,
    source_id: Uuid,
    fields: &PromptFields,
) -> Result<PromptWrite, StepError> {
    let mut tx = pool.begin().await?;

    let tags = Tag::names_for_prompt(&mut *tx, source_id).await?;
    let prompt = Prompt::create(&mut *tx, actor.id, fields).await?;
    Tag::replace_for_prompt(&mut tx, prompt.id, &tags).await?;
    let version = PromptVersion::append(&mut tx, prompt.id, Some(actor.id)).await?;
    SavedPrompt::save(&mut *tx, prompt.id, actor.id).await?;

    tx.commit().await?;

    Ok(PromptWrite {
        prompt_id: prompt.id,
        version: version.version,
        unknown_collaborators: Vec::new(),
    })
}

/// Copies a stored snapshot back onto the prompt as a new version
pub async fn restore_version(
    pool: &PgPool,
    actor: &Actor,
    prompt_id: Uuid,
    version_id: Uuid,
) -> Result<PromptWrite, ServiceError> {
    let version = PromptVersion::find_by_id(pool, version_id)
        .await
        .map_err(read_failed("prompt.restoreVersion", RESTORE_FAILED))?
        .filter(|v| v.prompt_id == prompt_id)
        .ok_or(ServiceError::NotFound(VERSION_NOT_FOUND))?;

    let (prompt, grants) = load_with_grants(pool, prompt_id)
        .await
        .map_err(read_failed("prompt.restoreVersion", RESTORE_FAILED))?
        .ok_or(ServiceError::NotFound(VERSION_NOT_FOUND))?;
    require_edit(actor, &PromptAccess::of(&prompt, &grants), AuthzError::RestoreVersion)?;

    let write = apply_restore(pool, actor, &version)
        .await
        .map_err(|e| e.fail("prompt.restoreVersion", RESTORE_FAILED))?;

    AuditLog::record(
        pool,
        NewAuditEntry::prompt(AuditAction::PromptRestoreVersion, Some(actor.id), prompt_id)
            .with("restoredFromVersionId", version_id.to_string())
            .with("restoredVersionNumber", version.version),
    )
    .await;
    info!(%prompt_id, restored = version.version, version = write.version, "Prompt version restored");

    Ok(write)
}

async fn apply_restore(pool: &PgPool, actor: &Actor, snapshot: &PromptVersion) -> Result<PromptWrite, StepError> {
    let mut tx = pool.begin().await?;

    Prompt::lock_for_update(&mut tx, snapshot.prompt_id)
        .await?
        .ok_or(StepError::Missing("prompt"))?;
    let category_id = require_category(&mut tx, Some(snapshot.category_id)).await?;

    let fields = PromptFields {
        title: snapshot.title.clone(),
        description: snapshot.description.clone(),
        content: snapshot.content.clone(),
        category_id,
        visibility: snapshot.visibility,
        status: snapshot.status,
    };
    Prompt::update(&mut *tx, snapshot.prompt_id, &fields).await?;
    Tag::replace_for_prompt(&mut tx, snapshot.prompt_id, &snapshot.tag_names()).await?;
    let version = PromptVersion::append(&mut tx, snapshot.prompt_id, Some(actor.id)).await?;

    tx.commit().await?;

    Ok(PromptWrite {
        prompt_id: snapshot.prompt_id,
        version: version.version,
        unknown_collaborators: Vec::new(),
    })
}

/// Prompts the actor may see, filtered
pub async fn list_prompts(
    pool: &PgPool,
    actor: &Actor,
    filter: &PromptListFilter,
) -> Result<Vec<PromptSummary>, ServiceError> {
    Prompt::list(pool, actor.id, actor.is_admin(), filter)
        .await
        .map_err(read_failed("prompt.list", LOAD_FAILED))
}

async fn visible_prompt(
    pool: &PgPool,
    actor: &Actor,
    prompt_id: Uuid,
) -> Result<(Prompt, Vec<CollaboratorGrant>), ServiceError> {
    let (prompt, grants) = load_with_grants(pool, prompt_id)
        .await
        .map_err(read_failed("prompt.read", LOAD_FAILED))?
        .ok_or(ServiceError::NotFound(PROMPT_NOT_FOUND))?;

    if !can_view(actor, &PromptAccess::of(&prompt, &grants)) {
        return Err(ServiceError::NotFound(PROMPT_NOT_FOUND));
    }
    Ok((prompt, grants))
}

/// One prompt with collaborators and the actor's permissions
pub async fn prompt_detail(pool: &PgPool, actor: &Actor, prompt_id: Uuid) -> Result<PromptDetail, ServiceError> {
    let (prompt, grants) = visible_prompt(pool, actor, prompt_id).await?;
    let access = PromptAccess::of(&prompt, &grants);

    let summary = Prompt::summary(pool, prompt_id, actor.id)
        .await
        .map_err(read_failed("prompt.read", LOAD_FAILED))?
        .ok_or(ServiceError::NotFound(PROMPT_NOT_FOUND))?;
    let collaborators = PromptCollaborator::entries_for_prompt(pool, prompt_id)
        .await
        .map_err(read_failed("prompt.read", LOAD_FAILED))?;

    Ok(PromptDetail {
        prompt: summary,
        collaborators,
        permissions: PromptPermissions {
            can_edit: can_edit(actor, &access),
            can_delete: can_delete(actor, &access),
            can_duplicate: can_create_prompt(actor.role),
        },
    })
}

/// Versions, newest first, and the most recent audit entries
pub async fn prompt_history(pool: &PgPool, actor: &Actor, prompt_id: Uuid) -> Result<PromptHistory, ServiceError> {
    visible_prompt(pool, actor, prompt_id).await?;

    let prompt = Prompt::summary(pool, prompt_id, actor.id)
        .await
        .map_err(read_failed("prompt.history", LOAD_FAILED))?
        .ok_or(ServiceError::NotFound(PROMPT_NOT_FOUND))?;
    let versions = PromptVersion::list_for_prompt(pool, prompt_id)
        .await
        .map_err(read_failed("prompt.history", LOAD_FAILED))?;
    let audit = AuditLog::recent_for_prompt(pool, prompt_id, HISTORY_AUDIT_LIMIT)
        .await
        .map_err(read_failed("prompt.history", LOAD_FAILED))?;

    Ok(PromptHistory {
        prompt,
        versions,
        audit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::prompt::PromptVisibility;
    use serde_json::json;
    use crate::models::user::UserRole;

    fn command() -> PromptCommand {
        PromptCommand {
            title: "Weekly digest".to_string(),
            description: None,
            content: "Summarize the week in five bullets.".to_string(),
            category_id: Some(Uuid::new_v4()),
            tags: vec!["email".to_string()],
            collaborator_emails: vec!["a@example.com".to_string(), "ghost@example.com".to_string()],
            visibility: PromptVisibility::Private,
            status: PromptStatus::Approved,
            is_saved: false,
        }
    }

    #[test]
    fn test_write_entry_metadata() {
        let actor = Actor::new(Uuid::new_v4(), UserRole::Editor);
        let prompt_id = Uuid::new_v4();
        let entry = write_entry(AuditAction::PromptUpdate, &actor, &command(), prompt_id);

        assert_eq!(entry.actor_id, Some(actor.id));
        assert_eq!(entry.prompt_id, Some(prompt_id));

        let metadata = entry.metadata.expect("metadata");
        assert_eq!(metadata["visibility"], json!("PRIVATE"));
        assert_eq!(metadata["status"], json!("APPROVED"));
        assert_eq!(metadata["collaboratorCount"], json!(2));
    }
}
