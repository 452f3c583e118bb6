/// Category form commands

use serde::Deserialize;
use validator::Validate;

use super::{first_message, ValidationError};

/// Category create form as submitted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CategoryForm {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Validate)]
struct CategoryInput<'a> {
    #[validate(length(min = 2, max = 60, message = "Category name must be between 2 and 60 characters."))]
    name: &'a str,
}

/// A validated category create request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCommand {
    pub name: String,
    pub description: Option<String>,
}

impl CategoryForm {
    pub fn into_command(self) -> Result<CategoryCommand, ValidationError> {
        let input = CategoryInput {
            name: self.name.trim(),
        };
        input
            .validate()
            .map_err(|errors| first_message(&errors, &["name"]))?;

        let description = self.description.trim();

        Ok(CategoryCommand {
            name: input.name.to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
        })
    }
}
