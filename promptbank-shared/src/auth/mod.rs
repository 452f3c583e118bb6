/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and the account password policy
/// - [`session`]: HS256 session tokens (issue, validate, renew)
/// - [`lockout`]: Pure rules for the failed-login lockout state machine
/// - [`login`]: Credential check that applies the lockout rules and audits
/// - [`authorization`]: Pure role and prompt-level permission checks
/// - [`middleware`]: Axum middleware that attaches the session user
///
/// # Example
///
/// ```no_run
/// use chrono::Utc;
/// use promptbank_shared::auth::login::authenticate;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let user = authenticate(&pool, "Admin@Example.com ", "Correct-Horse-42", Utc::now()).await?;
/// println!("Signed in as {}", user.email);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod lockout;
pub mod login;
pub mod middleware;
pub mod password;
pub mod session;
