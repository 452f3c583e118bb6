/// Category administration

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{read_failed, ServiceError, StepError};
use crate::auth::authorization::{require_manage_categories, Actor};
use crate::commands::category::CategoryForm;
use crate::models::audit_log::{AuditAction, AuditEntity, AuditLog, NewAuditEntry};
use crate::models::category::{Category, CategoryWithCount};

pub const CATEGORY_NOT_FOUND: &str = "Category not found.";
pub const CREATE_FAILED: &str = "Unable to create category. Name may already exist.";
pub const DELETE_FAILED: &str = "Unable to delete category. It might be used by prompts.";
pub const LOAD_FAILED: &str = "Unable to load categories.";

pub async fn list_categories(pool: &PgPool) -> Result<Vec<CategoryWithCount>, ServiceError> {
    Category::list_with_counts(pool)
        .await
        .map_err(read_failed("category.list", LOAD_FAILED))
}

/// Creates a category; a duplicate name fails with the generic message
pub async fn create_category(pool: &PgPool, actor: &Actor, form: CategoryForm) -> Result<Category, ServiceError> {
    require_manage_categories(actor)?;
    let cmd = form.into_command()?;

    let category = Category::create(pool, &cmd.name, cmd.description.as_deref())
        .await
        .map_err(|e| StepError::from(e).fail("category.create", CREATE_FAILED))?;

    AuditLog::record(
        pool,
        NewAuditEntry::new(AuditAction::CategoryCreate, AuditEntity::Category, category.id.to_string())
            .actor(Some(actor.id)),
    )
    .await;
    info!(category_id = %category.id, name = %category.name, "Category created");

    Ok(category)
}

/// Deletes an unused category
pub async fn delete_category(pool: &PgPool, actor: &Actor, category_id: Uuid) -> Result<(), ServiceError> {
    require_manage_categories(actor)?;

    let deleted = Category::delete(pool, category_id)
        .await
        .map_err(|e| StepError::from(e).fail("category.delete", DELETE_FAILED))?;
    if !deleted {
        return Err(ServiceError::NotFound(CATEGORY_NOT_FOUND));
    }

    AuditLog::record(
        pool,
        NewAuditEntry::new(AuditAction::CategoryDelete, AuditEntity::Category, category_id.to_string())
            .actor(Some(actor.id)),
    )
    .await;
    info!(%category_id, "Category deleted");

    Ok(())
}
