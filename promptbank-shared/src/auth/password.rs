/// Password hashing and password policy
///
/// Passwords are stored as Argon2id PHC strings. Parameters are embedded in
/// each hash, so verification keeps working if they are tuned later.
///
/// # Policy
///
/// New and reset passwords must be 12 to 128 characters and contain a
/// lower-case letter, an upper-case letter, a digit and a symbol (anything
/// outside `[A-Za-z0-9]`).
///
/// # Example
///
/// ```
/// use promptbank_shared::auth::password::{hash_password, is_strong_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// assert!(is_strong_password("Correct-Horse-42"));
///
/// let hash = hash_password("Correct-Horse-42")?;
/// assert!(verify_password("Correct-Horse-42", &hash)?);
/// assert!(!verify_password("correct-horse-42", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, ParamsBuilder, Version,
};

/// Shortest accepted password, in characters
pub const MIN_PASSWORD_LENGTH: usize = 12;

/// Longest accepted password, in characters
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Message shown when a password fails the policy
pub const PASSWORD_POLICY_MESSAGE: &str =
    "Password must be 12-128 chars and include upper, lower, number, and symbol.";

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    // 19 MiB, 2 passes, 1 lane
    let params = ParamsBuilder::new()
        .m_cost(19_456)
        .t_cost(2)
        .p_cost(1)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password into an Argon2id PHC string with a fresh salt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Checks a password against a stored PHC string
///
/// Returns `Ok(false)` on mismatch and an error only when the stored hash is
/// unreadable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;
    if parsed.hash.is_none() || parsed.salt.is_none() {
        return Err(PasswordError::InvalidHash("Hash has no salt or output".to_string()));
    }

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Whether a password satisfies the account password policy
pub fn is_strong_password(password: &str) -> bool {
    let length = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
        return false;
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| !c.is_ascii_alphanumeric());

    has_lower && has_upper && has_digit && has_symbol
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2id_phc() {
        let hash = hash_password("Sufficiently-Long-1").expect("hash");
        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(hash.contains("m=19456,t=2,p=1"));
    }

    #[test]
    fn test_same_password_different_salts() {
        let a = hash_password("Sufficiently-Long-1").expect("hash");
        let b = hash_password("Sufficiently-Long-1").expect("hash");
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_correct_and_incorrect() {
        let hash = hash_password("Sufficiently-Long-1").expect("hash");
        assert!(verify_password("Sufficiently-Long-1", &hash).expect("verify"));
        assert!(!verify_password("sufficiently-long-1", &hash).expect("verify"));
        assert!(!verify_password("", &hash).expect("verify"));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(verify_password("whatever", "not-a-hash").is_err());
        assert!(verify_password("whatever", "$argon2id$broken").is_err());
        assert!(verify_password("whatever", "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ").is_err());
    }

    #[test]
    fn test_policy_accepts_strong_passwords() {
        for password in ["Correct-Horse-42", "Aa1!Aa1!Aa1!", "Tr0ub4dor&3xyz"] {
            assert!(is_strong_password(password), "{} should pass", password);
        }
    }

    #[test]
    fn test_policy_length_bounds() {
        assert!(!is_strong_password("Aa1!Aa1!Aa1"));
        assert!(is_strong_password("Aa1!Aa1!Aa1!"));

        let at_max = format!("Aa1!{}", "x".repeat(MAX_PASSWORD_LENGTH - 4));
        assert!(is_strong_password(&at_max));

        let over_max = format!("Aa1!{}", "x".repeat(MAX_PASSWORD_LENGTH - 3));
        assert!(!is_strong_password(&over_max));
    }

    #[test]
    fn test_policy_requires_each_class() {
        assert!(!is_strong_password("correct-horse-42"));
        assert!(!is_strong_password("CORRECT-HORSE-42"));
        assert!(!is_strong_password("Correct-Horse-xx"));
        assert!(!is_strong_password("CorrectHorse42x"));
    }

    #[test]
    fn test_policy_counts_non_ascii_as_symbol() {
        assert!(is_strong_password("Passwörd12345"));
    }
}
