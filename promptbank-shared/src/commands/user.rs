/// User administration commands

use serde::Deserialize;
use validator::Validate;

use super::{char_len, first_message, invalid, normalize_email, ValidationError};
use crate::auth::password::{is_strong_password, PASSWORD_POLICY_MESSAGE};
use crate::models::user::UserRole;

pub const EMAIL_MAX: usize = 254;

/// User create form as submitted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateUserForm {
    pub name: String,
    pub email: String,
    pub role: String,
    pub password: String,
}

/// Role change form as submitted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoleForm {
    pub role: String,
}

/// Password reset form as submitted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PasswordForm {
    pub password: String,
}

#[derive(Debug, Validate)]
struct CreateUserInput<'a> {
    #[validate(custom(function = "validate_email"))]
    email: &'a str,

    #[validate(custom(function = "validate_password"))]
    password: &'a str,
}

fn validate_email(email: &str) -> Result<(), validator::ValidationError> {
    if email.is_empty() || char_len(email) > EMAIL_MAX || !email.contains('@') {
        return Err(invalid("email", "Provide a valid email."));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), validator::ValidationError> {
    if !is_strong_password(password) {
        return Err(invalid("password", PASSWORD_POLICY_MESSAGE));
    }
    Ok(())
}

/// A validated user create request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserCommand {
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub password: String,
}

impl CreateUserForm {
    /// Validates the form; an unrecognized role falls back to `VIEWER`
    pub fn into_command(self) -> Result<CreateUserCommand, ValidationError> {
        let email = normalize_email(&self.email);

        CreateUserInput {
            email: &email,
            password: &self.password,
        }
        .validate()
        .map_err(|errors| first_message(&errors, &["email", "password"]))?;

        let name = self.name.trim();

        Ok(CreateUserCommand {
            email,
            name: (!name.is_empty()).then(|| name.to_string()),
            role: self.role.parse().unwrap_or(UserRole::Viewer),
            password: self.password,
        })
    }
}

impl RoleForm {
    pub fn into_role(self) -> Result<UserRole, ValidationError> {
        self.role
            .parse()
            .map_err(|_| ValidationError::new("Invalid role update request."))
    }
}

impl PasswordForm {
    pub fn into_password(self) -> Result<String, ValidationError> {
        if is_strong_password(&self.password) {
            Ok(self.password)
        } else {
            Err(ValidationError::new(PASSWORD_POLICY_MESSAGE))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> CreateUserForm {
        CreateUserForm {
            name: "  Dana ".to_string(),
            email: "  Dana@Example.COM ".to_string(),
            role: "editor".to_string(),
            password: "Correct-Horse-42".to_string(),
        }
    }

    #[test]
    fn test_create_user_normalizes() {
        let cmd = form().into_command().expect("valid");
        assert_eq!(cmd.email, "dana@example.com");
        assert_eq!(cmd.name.as_deref(), Some("Dana"));
        assert_eq!(cmd.role, UserRole::Editor);
    }

    #[test]
    fn test_unknown_role_falls_back_to_viewer() {
        let cmd = CreateUserForm {
            role: "superuser".to_string(),
            ..form()
        }
        .into_command()
        .expect("valid");
        assert_eq!(cmd.role, UserRole::Viewer);
    }

    #[test]
    fn test_invalid_emails() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        for email in ["", "   ", "no-at-sign.example.com", too_long.as_str()] {
            let err = CreateUserForm {
                email: email.to_string(),
                ..form()
            }
            .into_command()
            .unwrap_err();
            assert_eq!(err.message(), "Provide a valid email.", "{}", email);
        }
    }

    #[test]
    fn test_email_error_reported_before_password() {
        let err = CreateUserForm {
            email: "bad".to_string(),
            password: "weak".to_string(),
            ..form()
        }
        .into_command()
        .unwrap_err();
        assert_eq!(err.message(), "Provide a valid email.");
    }

    #[test]
    fn test_weak_password_rejected() {
        let err = CreateUserForm {
            password: "short".to_string(),
            ..form()
        }
        .into_command()
        .unwrap_err();
        assert_eq!(err.message(), PASSWORD_POLICY_MESSAGE);
    }

    #[test]
    fn test_role_form() {
        assert_eq!(RoleForm { role: "ADMIN".to_string() }.into_role(), Ok(UserRole::Admin));
        assert_eq!(
            RoleForm { role: "owner".to_string() }.into_role().unwrap_err().message(),
            "Invalid role update request."
        );
    }

    #[test]
    fn test_password_form() {
        assert!(PasswordForm { password: "Correct-Horse-42".to_string() }.into_password().is_ok());
        assert!(PasswordForm { password: "correct-horse".to_string() }.into_password().is_err());
    }
}
