/// Mutation workflows
///
/// Each service function re-checks authorization, validates its input,
/// applies the change inside one transaction, then appends an audit entry
/// after commit. The audit write is best-effort.
///
/// Storage failures never leak to callers: they are logged and replaced by a
/// fixed, operation-specific message.

pub mod categories;
pub mod prompts;
pub mod users;

use tracing::error;

use crate::auth::authorization::AuthzError;
use crate::commands::ValidationError;

/// Why a service call was refused or failed
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The actor lacks the permission
    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    /// Input failed validation; the message names the first bad field
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(&'static str),

    /// The change would break an invariant (last admin, self-deletion)
    #[error("{0}")]
    Rejected(&'static str),

    /// The change could not be applied; `message` is safe to show
    #[error("{message}")]
    Failed {
        message: &'static str,
        #[source]
        source: Option<sqlx::Error>,
    },
}

impl ServiceError {
    /// Message suitable for the user
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Failure inside a write transaction, before it is given a user message
#[derive(Debug)]
pub(crate) enum StepError {
    /// A referenced row is gone (category, prompt)
    Missing(&'static str),
    Database(sqlx::Error),

    /// A rule check inside the transaction refused the change
    Refused(ServiceError),
}

impl From<sqlx::Error> for StepError {
    fn from(e: sqlx::Error) -> Self {
        StepError::Database(e)
    }
}

impl StepError {
    /// Logs the cause and wraps it in the operation's generic message
    pub(crate) fn fail(self, operation: &'static str, message: &'static str) -> ServiceError {
        match self {
            StepError::Missing(what) => {
                error!(operation, missing = what, "Write aborted: referenced row missing");
                ServiceError::Failed {
                    message,
                    source: None,
                }
            }
            StepError::Database(e) => {
                error!(operation, error = %e, "Write failed");
                ServiceError::Failed {
                    message,
                    source: Some(e),
                }
            }
            StepError::Refused(refusal) => refusal,
        }
    }
}

/// Logs a read failure and hides it behind `message`
pub(crate) fn read_failed(operation: &'static str, message: &'static str) -> impl FnOnce(sqlx::Error) -> ServiceError {
    move |e| {
        error!(operation, error = %e, "Read failed");
        ServiceError::Failed {
            message,
            source: Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(
            ServiceError::from(AuthzError::ManageUsers).user_message(),
            "Only admins can manage users."
        );
        assert_eq!(
            ServiceError::from(ValidationError::new("Category is required.")).user_message(),
            "Category is required."
        );
        assert_eq!(ServiceError::NotFound("Prompt not found").user_message(), "Prompt not found");
    }

    #[test]
    fn test_failure_hides_cause() {
        let err = StepError::Database(sqlx::Error::RowNotFound)
            .fail("prompt.create", "Unable to create prompt. Please try again.");
        assert_eq!(err.user_message(), "Unable to create prompt. Please try again.");
        assert!(matches!(err, ServiceError::Failed { source: Some(_), .. }));
    }

    #[test]
    fn test_missing_row_fails_without_source() {
        let err = StepError::Missing("category").fail("prompt.update", "Unable to update prompt. Please try again.");
        assert!(matches!(err, ServiceError::Failed { source: None, .. }));
    }

    #[test]
    fn test_refusal_passes_through() {
        let err = StepError::Refused(ServiceError::Rejected("At least one admin user must remain."))
            .fail("user.delete", "Unable to delete user.");
        assert_eq!(err.user_message(), "At least one admin user must remain.");
    }
}
