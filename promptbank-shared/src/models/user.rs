/// User model and database operations
///
/// Users authenticate with email and password and carry exactly one global
/// role. The lockout bookkeeping (`failed_logins`, `locked_until`) lives on
/// the same row; the rules that drive it are in [`crate::auth::lockout`].
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('admin', 'editor', 'viewer');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(254) NOT NULL UNIQUE,
///     name VARCHAR(255),
///     role user_role NOT NULL DEFAULT 'viewer',
///     password_hash VARCHAR(255) NOT NULL,
///     failed_logins INTEGER NOT NULL DEFAULT 0,
///     locked_until TIMESTAMPTZ,
///     last_login_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use promptbank_shared::models::user::{CreateUser, User, UserRole};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "editor@example.com".to_string(),
///     name: Some("Editor".to_string()),
///     role: UserRole::Editor,
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
///
/// let found = User::find_by_email(&pool, "editor@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

/// Global role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    /// Manages users, categories and every prompt
    Admin,

    /// Creates prompts and manages categories
    Editor,

    /// Reads TEAM prompts and prompts shared with them
    Viewer,
}

impl UserRole {
    /// All roles, highest privilege first
    pub const ALL: [UserRole; 3] = [UserRole::Admin, UserRole::Editor, UserRole::Viewer];

    /// Wire name used in forms and JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Editor => "EDITOR",
            UserRole::Viewer => "VIEWER",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(UserRole::Admin),
            "EDITOR" => Ok(UserRole::Editor),
            "VIEWER" => Ok(UserRole::Viewer),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Lower-cased, trimmed email address
    pub email: String,

    /// Optional display name
    pub name: Option<String>,

    /// Global role
    pub role: UserRole,

    /// Argon2id PHC string; never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Consecutive failed login attempts since the last success or unlock
    pub failed_logins: i32,

    /// Logins are refused while this lies in the future
    pub locked_until: Option<DateTime<Utc>>,

    /// Time of the last successful login
    pub last_login_at: Option<DateTime<Utc>>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last modified
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether a lock is in force at `now`
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

/// Input for creating a new user
///
/// The email must already be normalized and the password already hashed.
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Normalized email address
    pub email: String,

    /// Optional display name
    pub name: Option<String>,

    /// Role to assign
    pub role: UserRole,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: String,
}

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Fails with a unique-constraint violation if the email is taken.
    pub async fn create<'e, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, role, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name, role, password_hash, failed_logins,
                      locked_until, last_login_at, created_at, updated_at
            "#,
        )
        .bind(data.email)
        .bind(data.name)
        .bind(data.role)
        .bind(data.password_hash)
        .fetch_one(executor)
        .await
    }

    /// Finds a user by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, role, password_hash, failed_logins,
                   locked_until, last_login_at, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Finds a user by normalized email address
    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, role, password_hash, failed_logins,
                   locked_until, last_login_at, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(executor)
        .await
    }

    /// Resolves a list of normalized emails to `(id, email)` pairs
    ///
    /// Emails without an account are simply absent from the result.
    pub async fn find_ids_by_emails<'e, E>(
        executor: E,
        emails: &[String],
    ) -> Result<Vec<(Uuid, String)>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        if emails.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, (Uuid, String)>("SELECT id, email FROM users WHERE email = ANY($1)")
            .bind(emails)
            .fetch_all(executor)
            .await
    }

    /// Lists every user ordered by email
    pub async fn list<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, role, password_hash, failed_logins,
                   locked_until, last_login_at, created_at, updated_at
            FROM users
            ORDER BY email ASC
            "#,
        )
        .fetch_all(executor)
        .await
    }

    /// Counts admins, optionally leaving one user out of the count
    ///
    /// Call [`User::lock_admins`] first inside the same transaction so a
    /// concurrent demotion cannot slip between the count and the write.
    pub async fn count_admins_excluding<'e, E>(
        executor: E,
        excluding: Option<Uuid>,
    ) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE role = 'admin' AND ($1::uuid IS NULL OR id <> $1)",
        )
        .bind(excluding)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }

    /// Row-locks every admin for the rest of the transaction
    pub async fn lock_admins(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT id FROM users WHERE role = 'admin' FOR UPDATE")
            .fetch_all(conn)
            .await?;
        Ok(())
    }

    /// Changes a user's role; returns false if the user doesn't exist
    pub async fn update_role<'e, E>(executor: E, id: Uuid, role: UserRole) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(role)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the password hash and clears any lockout
    pub async fn reset_password<'e, E>(
        executor: E,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, failed_logins = 0, locked_until = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Clears the failure counter and any lock
    pub async fn unlock<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE users SET failed_logins = 0, locked_until = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Current failure counter, locking the row until the transaction ends
    pub async fn failed_logins_for_update(conn: &mut PgConnection, id: Uuid) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar("SELECT failed_logins FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Stores the outcome of a failed login attempt
    pub async fn record_failed_login<'e, E>(
        executor: E,
        id: Uuid,
        failed_logins: i32,
        locked_until: Option<DateTime<Utc>>,
    ) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query("UPDATE users SET failed_logins = $2, locked_until = $3 WHERE id = $1")
            .bind(id)
            .bind(failed_logins)
            .bind(locked_until)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Resets lockout state and stamps `last_login_at`
    pub async fn record_successful_login<'e, E>(
        executor: E,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            "UPDATE users SET failed_logins = 0, locked_until = NULL, last_login_at = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Deletes a user; returns false if the user didn't exist
    ///
    /// Owned prompts become ownerless; collaborations and bookmarks cascade.
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
