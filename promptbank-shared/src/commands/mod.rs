/// Typed mutation inputs
///
/// Raw form values arrive as strings. Each command type here turns them into
/// a validated value once, at the boundary, so services only ever see clean
/// data. Validation uses `validator` derives; when several fields fail, the
/// message of the first field in form order wins.
///
/// # Example
///
/// ```
/// use promptbank_shared::commands::{parse_emails, parse_tags};
///
/// assert_eq!(parse_tags(" Email, SUMMARY,email ,, "), vec!["email", "summary"]);
/// assert_eq!(parse_emails("A@x.io, a@x.io"), vec!["a@x.io"]);
/// ```

pub mod category;
pub mod prompt;
pub mod user;

use std::borrow::Cow;

use validator::ValidationErrors;

/// A rejected input, carrying the message to show the user
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Lower-cases and trims an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Splits a comma-separated list, normalizing and de-duplicating entries
///
/// Entries are trimmed and lower-cased, empty ones dropped, and the first
/// occurrence of each kept in order.
fn parse_list(raw: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in raw.split(',').map(|s| s.trim().to_lowercase()) {
        if !item.is_empty() && !items.contains(&item) {
            items.push(item);
        }
    }
    items
}

/// Tag names from a comma-separated input
pub fn parse_tags(raw: &str) -> Vec<String> {
    parse_list(raw)
}

/// Email addresses from a comma-separated input
pub fn parse_emails(raw: &str) -> Vec<String> {
    parse_list(raw)
}

/// Picks the message of the first failing field, in `field_order`
pub(crate) fn first_message(errors: &ValidationErrors, field_order: &[&str]) -> ValidationError {
    let field_errors = errors.field_errors();

    let mut ordered: Vec<_> = field_errors.iter().collect();
    ordered.sort_by_key(|(name, _)| {
        let name = name.to_string();
        field_order
            .iter()
            .position(|field| *field == name)
            .unwrap_or(field_order.len())
    });

    ordered
        .into_iter()
        .flat_map(|(_, errs)| errs.iter())
        .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
        .map(ValidationError)
        .unwrap_or_else(|| ValidationError::new("Invalid input."))
}

/// Builds a `validator` error with a user-facing message
pub(crate) fn invalid(code: &'static str, message: &'static str) -> validator::ValidationError {
    let mut error = validator::ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Length in characters rather than bytes
pub(crate) fn char_len(value: &str) -> usize {
    value.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags_normalizes_and_dedupes() {
        assert_eq!(parse_tags("Email, summary, EMAIL, , onboarding"), vec!["email", "summary", "onboarding"]);
    }

    #[test]
    fn test_parse_tags_preserves_first_occurrence_order() {
        assert_eq!(parse_tags("b,a,B,c,a"), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_parse_tags_empty_input() {
        assert!(parse_tags("").is_empty());
        assert!(parse_tags(" , ,, ").is_empty());
    }

    #[test]
    fn test_parse_emails() {
        assert_eq!(
            parse_emails(" Alice@Example.com ,bob@example.com,alice@example.com"),
            vec!["alice@example.com", "bob@example.com"]
        );
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Admin@Example.COM "), "admin@example.com");
    }

    #[test]
    fn test_char_len_counts_code_points() {
        assert_eq!(char_len("héllo"), 5);
    }
}
