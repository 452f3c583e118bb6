/// Database models for Prompt Bank
///
/// Each model owns its table's SQL. Single-statement queries accept any
/// `PgExecutor` (a pool or a transaction); multi-statement ones take a
/// `&mut PgConnection` so callers must supply a transaction.
///
/// # Models
///
/// - `user`: Accounts, roles and login lockout state
/// - `category`: Prompt taxonomy
/// - `prompt`: Prompts and the filtered listing query
/// - `tag`: Tags and the prompt ↔ tag join
/// - `collaborator`: Per-prompt edit grants
/// - `prompt_version`: Append-only snapshots
/// - `saved_prompt`: Personal bookmarks
/// - `audit_log`: Append-only audit trail
///
/// # Example
///
/// ```no_run
/// use promptbank_shared::models::user::{CreateUser, User, UserRole};
/// use promptbank_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::from_url("postgresql://localhost/promptbank")).await?;
///
/// let new_user = CreateUser {
///     email: "editor@example.com".to_string(),
///     name: Some("Ed Itor".to_string()),
///     role: UserRole::Editor,
///     password_hash: "$argon2id$...".to_string(),
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod audit_log;
pub mod category;
pub mod collaborator;
pub mod prompt;
pub mod prompt_version;
pub mod saved_prompt;
pub mod tag;
pub mod user;
