/// Startup bootstrap
///
/// Runs once after migrations. Creates the first admin when the database has
/// none and credentials are configured, and files the default categories
/// into an empty category table. Both steps are no-ops on a populated
/// database, so restarting the server never duplicates anything.

use sqlx::PgPool;
use tracing::{info, warn};

use crate::auth::password::{hash_password, is_strong_password, PasswordError};
use crate::commands::normalize_email;
use crate::models::audit_log::{AuditAction, AuditEntity, AuditLog, NewAuditEntry};
use crate::models::category::Category;
use crate::models::user::{CreateUser, User, UserRole};

/// Categories filed into an empty database
pub const DEFAULT_CATEGORIES: [(&str, &str); 3] = [
    (
        "Marketing",
        "Campaign, ad copy, messaging, and audience positioning prompts.",
    ),
    (
        "Engineering",
        "Code generation, debugging, design review, and architecture prompts.",
    ),
    (
        "Customer Success",
        "Customer response, onboarding, and support workflow prompts.",
    ),
];

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Bootstrap admin password does not meet the password policy")]
    WeakPassword,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Credentials for the first admin account
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SeedOptions {
    pub admin: Option<BootstrapAdmin>,
    pub categories: bool,
}

/// What [`run`] changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub admin_created: bool,
    pub categories_created: usize,
}

pub async fn run(pool: &PgPool, options: &SeedOptions) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    if let Some(admin) = &options.admin {
        report.admin_created = bootstrap_admin(pool, admin).await?;
    }
    if options.categories {
        report.categories_created = seed_categories(pool).await?;
    }

    Ok(report)
}

/// Creates an admin unless one already exists
pub async fn bootstrap_admin(pool: &PgPool, admin: &BootstrapAdmin) -> Result<bool, SeedError> {
    if User::count_admins_excluding(pool, None).await? > 0 {
        return Ok(false);
    }

    let email = normalize_email(&admin.email);
    if email.is_empty() || !email.contains('@') {
        warn!("BOOTSTRAP_ADMIN_EMAIL is not a valid email; skipping admin bootstrap");
        return Ok(false);
    }
    if !is_strong_password(&admin.password) {
        return Err(SeedError::WeakPassword);
    }

    let user = User::create(
        pool,
        CreateUser {
            email,
            name: Some("Admin".to_string()),
            role: UserRole::Admin,
            password_hash: hash_password(&admin.password)?,
        },
    )
    .await?;

    AuditLog::record(
        pool,
        NewAuditEntry::new(AuditAction::UserCreate, AuditEntity::User, user.id.to_string())
            .with("role", user.role.as_str())
            .with("email", user.email.as_str())
            .with("bootstrap", true),
    )
    .await;
    info!(user_id = %user.id, email = %user.email, "Bootstrap admin created");

    Ok(true)
}

/// Files [`DEFAULT_CATEGORIES`] when no category exists yet
pub async fn seed_categories(pool: &PgPool) -> Result<usize, SeedError> {
    if Category::count(pool).await? > 0 {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    for (name, description) in DEFAULT_CATEGORIES {
        Category::create(&mut *tx, name, Some(description)).await?;
    }
    tx.commit().await?;

    info!(count = DEFAULT_CATEGORIES.len(), "Default categories created");
    Ok(DEFAULT_CATEGORIES.len())
}
