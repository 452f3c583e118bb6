/// Credential login
///
/// Applies the [`lockout`](super::lockout) rules against the user table and
/// writes `auth.*` audit events. Every rejection looks the same to the
/// caller; the audit trail records the real reason.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{info, warn};

use super::lockout::{gate, register_failure, LoginGate};
use super::password::verify_password;
use crate::commands::normalize_email;
use crate::models::audit_log::{AuditAction, AuditEntity, AuditLog, NewAuditEntry};
use crate::models::user::User;

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// Unknown email, wrong password, or locked account
    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Checks credentials and updates lockout state
///
/// Returns the freshly updated user on success.
pub async fn authenticate(
    pool: &PgPool,
    email: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<User, LoginError> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(LoginError::InvalidCredentials);
    }

    let Some(user) = User::find_by_email(pool, &email).await? else {
        AuditLog::record(
            pool,
            NewAuditEntry::new(AuditAction::AuthLoginFailed, AuditEntity::Auth, email.as_str())
                .with("reason", "user_not_found"),
        )
        .await;
        return Err(LoginError::InvalidCredentials);
    };

    if let LoginGate::Locked { until } = gate(user.locked_until, now) {
        AuditLog::record(
            pool,
            auth_entry(AuditAction::AuthLoginBlocked, &user).with("lockedUntil", until.to_rfc3339()),
        )
        .await;
        return Err(LoginError::InvalidCredentials);
    }

    let matches = verify_password(password, &user.password_hash).unwrap_or_else(|e| {
        warn!(user_id = %user.id, error = %e, "Stored password hash is unreadable");
        false
    });

    if !matches {
        // Concurrent failures serialize on the user row
        let mut tx = pool.begin().await?;
        let failed_logins = User::failed_logins_for_update(&mut tx, user.id)
            .await?
            .ok_or(LoginError::InvalidCredentials)?;
        let outcome = register_failure(failed_logins, now);
        User::record_failed_login(&mut *tx, user.id, outcome.failed_logins, outcome.locked_until).await?;
        tx.commit().await?;

        if outcome.locks_account() {
            info!(user_id = %user.id, "Account locked after repeated failed logins");
        }

        AuditLog::record(
            pool,
            auth_entry(outcome.action(), &user)
                .with("failedLogins", outcome.failed_logins)
                .with("lockAccount", outcome.locks_account())
                .with(
                    "lockedUntil",
                    outcome
                        .locked_until
                        .map_or(Value::Null, |until| Value::from(until.to_rfc3339())),
                ),
        )
        .await;
        return Err(LoginError::InvalidCredentials);
    }

    User::record_successful_login(pool, user.id, now).await?;
    AuditLog::record(pool, auth_entry(AuditAction::AuthLoginSuccess, &user)).await;

    Ok(User {
        failed_logins: 0,
        locked_until: None,
        last_login_at: Some(now),
        ..user
    })
}

fn auth_entry(action: AuditAction, user: &User) -> NewAuditEntry {
    NewAuditEntry::new(action, AuditEntity::Auth, user.id.to_string()).actor(Some(user.id))
}
