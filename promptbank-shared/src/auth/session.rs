/// Session tokens
///
/// A session is an HS256-signed JWT carried in the `pb_session` cookie or an
/// `Authorization: Bearer` header. Sessions last eight hours; a token older
/// than thirty minutes is reissued on use so active users stay signed in.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use promptbank_shared::auth::session::{issue_token, validate_token, SessionClaims};
/// use promptbank_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-session-secret-of-at-least-32-bytes!";
/// let claims = SessionClaims::new(Uuid::new_v4(), "editor@example.com", UserRole::Editor, Utc::now());
/// let token = issue_token(&claims, secret)?;
///
/// let validated = validate_token(&token, secret)?;
/// assert_eq!(validated.email, "editor@example.com");
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::UserRole;

/// Issuer stamped into and required on every session token
pub const SESSION_ISSUER: &str = "promptbank";

/// Lifetime of a session token, in seconds
pub const SESSION_TTL_SECONDS: i64 = 8 * 60 * 60;

/// Age in seconds after which a token is reissued on use
pub const SESSION_RENEW_AFTER_SECONDS: i64 = 30 * 60;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User ID
    pub sub: Uuid,

    pub email: String,

    /// Role at issue time; the session layer re-reads the live role
    pub role: UserRole,

    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(user_id: Uuid, email: &str, role: UserRole, now: DateTime<Utc>) -> Self {
        Self {
            sub: user_id,
            email: email.to_string(),
            role,
            iss: SESSION_ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + Duration::seconds(SESSION_TTL_SECONDS)).timestamp(),
        }
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }

    /// Whether the token is old enough to be reissued
    pub fn should_renew(&self, now: DateTime<Utc>) -> bool {
        self.issued_at()
            .map_or(true, |issued| (now - issued).num_seconds() >= SESSION_RENEW_AFTER_SECONDS)
    }
}

/// Signs claims into a compact JWT
pub fn issue_token(claims: &SessionClaims, secret: &str) -> Result<String, SessionError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| SessionError::CreateError(e.to_string()))
}

/// Verifies signature, issuer, `exp` and `nbf`, and returns the claims
pub fn validate_token(token: &str, secret: &str) -> Result<SessionClaims, SessionError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[SESSION_ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    decode::<SessionClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => SessionError::Expired,
            _ => SessionError::Invalid(e.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-session-secret-at-least-32-bytes";

    fn claims_at(now: DateTime<Utc>) -> SessionClaims {
        SessionClaims::new(Uuid::new_v4(), "viewer@example.com", UserRole::Viewer, now)
    }

    #[test]
    fn test_claims_lifetime() {
        let now = Utc::now();
        let claims = claims_at(now);
        assert_eq!(claims.exp - claims.iat, SESSION_TTL_SECONDS);
        assert_eq!(claims.iss, SESSION_ISSUER);
    }

    #[test]
    fn test_issue_and_validate() {
        let claims = claims_at(Utc::now());
        let token = issue_token(&claims, SECRET).expect("issue");
        let validated = validate_token(&token, SECRET).expect("validate");
        assert_eq!(validated, claims);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token(&claims_at(Utc::now()), SECRET).expect("issue");
        let result = validate_token(&token, "another-secret-that-is-long-enough!!");
        assert!(matches!(result, Err(SessionError::Invalid(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = claims_at(Utc::now() - Duration::hours(9));
        let token = issue_token(&claims, SECRET).expect("issue");
        assert!(matches!(validate_token(&token, SECRET), Err(SessionError::Expired)));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let mut claims = claims_at(Utc::now());
        claims.iss = "someone-else".to_string();
        let token = issue_token(&claims, SECRET).expect("issue");
        assert!(validate_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(validate_token("not.a.jwt", SECRET).is_err());
        assert!(validate_token("", SECRET).is_err());
    }

    #[test]
    fn test_should_renew_after_thirty_minutes() {
        let issued = Utc::now();
        let claims = claims_at(issued);

        assert!(!claims.should_renew(issued));
        assert!(!claims.should_renew(issued + Duration::minutes(29)));
        assert!(claims.should_renew(issued + Duration::minutes(30)));
        assert!(claims.should_renew(issued + Duration::hours(2)));
    }
}
