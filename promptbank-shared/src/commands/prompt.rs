/// Prompt form commands
///
/// [`PromptForm`] is the raw create/edit form. [`PromptForm::into_command`]
/// trims, validates and parses it into a [`PromptCommand`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{char_len, first_message, invalid, parse_emails, parse_tags, ValidationError};
use crate::models::prompt::{PromptFields, PromptStatus, PromptVisibility};

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 120;
pub const CONTENT_MIN: usize = 10;
pub const CONTENT_MAX: usize = 10_000;

const COPY_SUFFIX: &str = " (Copy)";

/// Order in which field errors are reported
const FIELD_ORDER: [&str; 8] = [
    "title",
    "description",
    "content",
    "category_id",
    "tags_csv",
    "collaborator_emails_csv",
    "visibility",
    "status",
];

/// Create/edit form as submitted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptForm {
    pub title: String,
    pub description: String,
    pub content: String,
    pub category_id: String,
    pub tags_csv: String,
    pub collaborator_emails_csv: String,
    pub visibility: Option<String>,
    pub status: Option<String>,

    /// Checkbox; present as `"on"` when ticked
    pub is_saved: Option<String>,
}

/// Trimmed form values, checked field by field
#[derive(Debug, Validate)]
struct PromptInput<'a> {
    #[validate(custom(function = "validate_title"))]
    title: &'a str,

    #[validate(length(max = 300, message = "Description can be at most 300 characters."))]
    description: &'a str,

    #[validate(custom(function = "validate_content"))]
    content: &'a str,

    #[validate(length(min = 1, message = "Category is required."))]
    category_id: &'a str,

    #[validate(length(max = 500, message = "Tags input is too long."))]
    tags_csv: &'a str,

    #[validate(length(max = 1000, message = "Collaborators input is too long."))]
    collaborator_emails_csv: &'a str,

    #[validate(custom(function = "validate_visibility"))]
    visibility: &'a str,

    #[validate(custom(function = "validate_status"))]
    status: &'a str,
}

fn validate_title(title: &str) -> Result<(), validator::ValidationError> {
    let len = char_len(title);
    if len < TITLE_MIN {
        return Err(invalid("title", "Title must be at least 3 characters."));
    }
    if len > TITLE_MAX {
        return Err(invalid("title", "Title can be at most 120 characters."));
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<(), validator::ValidationError> {
    let len = char_len(content);
    if len < CONTENT_MIN {
        return Err(invalid("content", "Prompt content must be at least 10 characters."));
    }
    if len > CONTENT_MAX {
        return Err(invalid("content", "Prompt content can be at most 10,000 characters."));
    }
    Ok(())
}

fn validate_visibility(visibility: &str) -> Result<(), validator::ValidationError> {
    visibility
        .parse::<PromptVisibility>()
        .map(|_| ())
        .map_err(|_| invalid("visibility", "Visibility must be TEAM or PRIVATE."))
}

fn validate_status(status: &str) -> Result<(), validator::ValidationError> {
    status
        .parse::<PromptStatus>()
        .map(|_| ())
        .map_err(|_| invalid("status", "Status must be DRAFT, APPROVED or ARCHIVED."))
}

/// A validated prompt create/edit request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptCommand {
    pub title: String,
    pub description: Option<String>,
    pub content: String,

    /// `None` when the submitted value is not a UUID; such a category can
    /// never exist
    pub category_id: Option<Uuid>,

    pub tags: Vec<String>,
    pub collaborator_emails: Vec<String>,
    pub visibility: PromptVisibility,
    pub status: PromptStatus,
    pub is_saved: bool,
}

impl PromptCommand {
    /// Row fields, once the category has been resolved
    pub fn fields(&self, category_id: Uuid) -> PromptFields {
        PromptFields {
            title: self.title.clone(),
            description: self.description.clone(),
            content: self.content.clone(),
            category_id,
            visibility: self.visibility,
            status: self.status,
        }
    }
}

impl PromptForm {
    /// Validates the form, reporting the first failing field in form order
    pub fn into_command(self) -> Result<PromptCommand, ValidationError> {
        let visibility = self.visibility.as_deref().unwrap_or("TEAM");
        let status = self.status.as_deref().unwrap_or("DRAFT");

        let input = PromptInput {
            title: self.title.trim(),
            description: self.description.trim(),
            content: self.content.trim(),
            category_id: self.category_id.trim(),
            tags_csv: &self.tags_csv,
            collaborator_emails_csv: &self.collaborator_emails_csv,
            visibility,
            status,
        };

        input
            .validate()
            .map_err(|errors| first_message(&errors, &FIELD_ORDER))?;

        let visibility = visibility
            .parse::<PromptVisibility>()
            .map_err(ValidationError::new)?;
        let status = status.parse::<PromptStatus>().map_err(ValidationError::new)?;

        Ok(PromptCommand {
            title: input.title.to_string(),
            description: Some(input.description)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            content: input.content.to_string(),
            category_id: Uuid::parse_str(input.category_id).ok(),
            tags: parse_tags(&self.tags_csv),
            collaborator_emails: parse_emails(&self.collaborator_emails_csv),
            visibility,
            status,
            is_saved: self.is_saved.as_deref() == Some("on"),
        })
    }
}

/// Duplicate form as submitted
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DuplicateForm {
    pub duplicate_title: Option<String>,
}

/// Title for a duplicated prompt
///
/// A requested title is used when it is 3-120 characters after trimming;
/// otherwise the source title gets a ` (Copy)` suffix, shortening the
/// source title if needed to stay within the title limit.
pub fn duplicate_title(source_title: &str, requested: Option<&str>) -> String {
    if let Some(requested) = requested.map(str::trim) {
        if (TITLE_MIN..=TITLE_MAX).contains(&char_len(requested)) {
            return requested.to_string();
        }
    }

    let room = TITLE_MAX - char_len(COPY_SUFFIX);
    let base: String = source_title.chars().take(room).collect();
    format!("{}{}", base.trim_end(), COPY_SUFFIX)
}
