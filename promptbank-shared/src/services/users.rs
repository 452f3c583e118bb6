/// User administration (ADMIN only)
///
/// Role changes and deletions that could remove the last admin lock every
/// admin row first, then count. Two admins demoting each other concurrently
/// therefore cannot both succeed.

use sqlx::{PgConnection, PgPool};
use tracing::{error, info};
use uuid::Uuid;

use super::{read_failed, ServiceError, StepError};
use crate::auth::authorization::{require_manage_users, Actor};
use crate::auth::password::{hash_password, PasswordError};
use crate::commands::user::{CreateUserForm, PasswordForm, RoleForm};
use crate::models::audit_log::{AuditAction, AuditEntity, AuditLog, NewAuditEntry};
use crate::models::user::{CreateUser, User, UserRole};

pub const USER_NOT_FOUND: &str = "User not found.";
pub const LAST_ADMIN: &str = "At least one admin user must remain.";
pub const SELF_DELETE: &str = "You cannot delete your own account.";
pub const SELF_ROLE_CHANGE: &str = "You cannot change your own role.";
pub const CREATE_FAILED: &str = "Unable to create user. Email may already exist.";
pub const ROLE_FAILED: &str = "Unable to update user role.";
pub const RESET_FAILED: &str = "Unable to reset password.";
pub const UNLOCK_FAILED: &str = "Unable to unlock user.";
pub const DELETE_FAILED: &str = "Unable to delete user.";
pub const LOAD_FAILED: &str = "Unable to load users.";

fn hash_failed(operation: &'static str, message: &'static str) -> impl FnOnce(PasswordError) -> ServiceError {
    move |e| {
        error!(operation, error = %e, "Password hashing failed");
        ServiceError::Failed {
            message,
            source: None,
        }
    }
}

fn user_entry(action: AuditAction, actor: &Actor, user_id: Uuid) -> NewAuditEntry {
    NewAuditEntry::new(action, AuditEntity::User, user_id.to_string()).actor(Some(actor.id))
}

/// Refuses the change when no admin other than `user_id` would remain
///
/// Must run inside the transaction that applies the change.
async fn ensure_other_admin(conn: &mut PgConnection, user_id: Uuid) -> Result<(), StepError> {
    User::lock_admins(&mut *conn).await?;
    if User::count_admins_excluding(&mut *conn, Some(user_id)).await? < 1 {
        return Err(StepError::Refused(ServiceError::Rejected(LAST_ADMIN)));
    }
    Ok(())
}

pub async fn list_users(pool: &PgPool, actor: &Actor) -> Result<Vec<User>, ServiceError> {
    require_manage_users(actor)?;
    User::list(pool).await.map_err(read_failed("user.list", LOAD_FAILED))
}

pub async fn create_user(pool: &PgPool, actor: &Actor, form: CreateUserForm) -> Result<User, ServiceError> {
    require_manage_users(actor)?;
    let cmd = form.into_command()?;

    let password_hash = hash_password(&cmd.password).map_err(hash_failed("user.create", CREATE_FAILED))?;

    let user = User::create(
        pool,
        CreateUser {
            email: cmd.email,
            name: cmd.name,
            role: cmd.role,
            password_hash,
        },
    )
    .await
    .map_err(|e| StepError::from(e).fail("user.create", CREATE_FAILED))?;

    AuditLog::record(
        pool,
        user_entry(AuditAction::UserCreate, actor, user.id)
            .with("role", user.role.as_str())
            .with("email", user.email.as_str()),
    )
    .await;
    info!(user_id = %user.id, role = %user.role, "User created");

    Ok(user)
}

/// Changes another user's role, keeping at least one admin
pub async fn update_role(
    pool: &PgPool,
    actor: &Actor,
    user_id: Uuid,
    form: RoleForm,
) -> Result<(), ServiceError> {
    require_manage_users(actor)?;
    let role = form.into_role()?;
    if user_id == actor.id {
        return Err(ServiceError::Rejected(SELF_ROLE_CHANGE));
    }

    let previous = apply_role(pool, user_id, role)
        .await
        .map_err(|e| e.fail("user.role_update", ROLE_FAILED))?;

    AuditLog::record(
        pool,
        user_entry(AuditAction::UserRoleUpdate, actor, user_id)
            .with("previousRole", previous.role.as_str())
            .with("nextRole", role.as_str())
            .with("email", previous.email),
    )
    .await;
    info!(%user_id, from = %previous.role, to = %role, "User role changed");

    Ok(())
}

/// Returns the user as it was before the change
async fn apply_role(pool: &PgPool, user_id: Uuid, role: UserRole) -> Result<User, StepError> {
    let mut tx = pool.begin().await?;

    let target = User::find_by_id(&mut *tx, user_id)
        .await?
        .ok_or(StepError::Refused(ServiceError::NotFound(USER_NOT_FOUND)))?;

    if target.role == UserRole::Admin && role != UserRole::Admin {
        ensure_other_admin(&mut tx, user_id).await?;
    }

    User::update_role(&mut *tx, user_id, role).await?;
    tx.commit().await?;

    Ok(target)
}

/// Sets a new password and clears any lockout; admins may reset their own
pub async fn reset_password(
    pool: &PgPool,
    actor: &Actor,
    user_id: Uuid,
    form: PasswordForm,
) -> Result<(), ServiceError> {
    require_manage_users(actor)?;
    let password = form.into_password()?;

    let password_hash = hash_password(&password).map_err(hash_failed("user.password_reset", RESET_FAILED))?;

    let updated = User::reset_password(pool, user_id, &password_hash)
        .await
        .map_err(|e| StepError::from(e).fail("user.password_reset", RESET_FAILED))?;
    if !updated {
        return Err(ServiceError::NotFound(USER_NOT_FOUND));
    }

    AuditLog::record(pool, user_entry(AuditAction::UserPasswordReset, actor, user_id)).await;
    info!(%user_id, "User password reset");

    Ok(())
}

pub async fn unlock_user(pool: &PgPool, actor: &Actor, user_id: Uuid) -> Result<(), ServiceError> {
    require_manage_users(actor)?;

    let updated = User::unlock(pool, user_id)
        .await
        .map_err(|e| StepError::from(e).fail("user.unlock", UNLOCK_FAILED))?;
    if !updated {
        return Err(ServiceError::NotFound(USER_NOT_FOUND));
    }

    AuditLog::record(pool, user_entry(AuditAction::UserUnlock, actor, user_id)).await;
    info!(%user_id, "User unlocked");

    Ok(())
}

/// Deletes another user, keeping at least one admin
///
/// Prompts the user owned survive without an owner.
pub async fn delete_user(pool: &PgPool, actor: &Actor, user_id: Uuid) -> Result<(), ServiceError> {
    require_manage_users(actor)?;
    if user_id == actor.id {
        return Err(ServiceError::Rejected(SELF_DELETE));
    }

    let target = apply_delete(pool, user_id)
        .await
        .map_err(|e| e.fail("user.delete", DELETE_FAILED))?;

    AuditLog::record(
        pool,
        user_entry(AuditAction::UserDelete, actor, user_id)
            .with("email", target.email)
            .with("role", target.role.as_str()),
    )
    .await;
    info!(%user_id, "User deleted");

    Ok(())
}

async fn apply_delete(pool: &PgPool, user_id: Uuid) -> Result<User, StepError> {
    let mut tx = pool.begin().await?;

    let target = User::find_by_id(&mut *tx, user_id)
        .await?
        .ok_or(StepError::Refused(ServiceError::NotFound(USER_NOT_FOUND)))?;

    if target.role == UserRole::Admin {
        ensure_other_admin(&mut tx, user_id).await?;
    }

    User::delete(&mut *tx, user_id).await?;
    tx.commit().await?;

    Ok(target)
}
