//! Tag Name Validation
//!
//! Names are compared case-insensitively; `name_key` is the comparison form.

use thiserror::Error;

use super::entity::DomainError;

pub const MAX_TAG_NAME_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagValidationError {
    #[error("tag name cannot be empty")]
    EmptyName,
    #[error("tag name is longer than {} characters", MAX_TAG_NAME_LEN)]
    NameTooLong,
    #[error("tag name contains control characters")]
    ControlCharacters,
    #[error("tag '{0}' already exists")]
    DuplicateName(String),
    #[error("invalid color '{0}'")]
    InvalidColor(String),
    #[error("a tag cannot be its own parent")]
    SelfParent,
}

impl From<TagValidationError> for DomainError {
    fn from(e: TagValidationError) -> Self {
        DomainError::Validation(e.to_string())
    }
}

/// Validate and trim a tag name
pub fn validate_tag_name(name: &str) -> Result<String, TagValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TagValidationError::EmptyName);
    }
    if trimmed.chars().count() > MAX_TAG_NAME_LEN {
        return Err(TagValidationError::NameTooLong);
    }
    if trimmed.chars().any(char::is_control) {
        return Err(TagValidationError::ControlCharacters);
    }
    Ok(trimmed.to_string())
}

/// Case-insensitive identity of a tag name
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names_are_trimmed() {
        assert_eq!(validate_tag_name("  Work ").unwrap(), "Work");
        assert_eq!(validate_tag_name("项目").unwrap(), "项目");
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(validate_tag_name(""), Err(TagValidationError::EmptyName));
        assert_eq!(validate_tag_name("   "), Err(TagValidationError::EmptyName));
    }

    #[test]
    fn test_too_long() {
        let name = "a".repeat(MAX_TAG_NAME_LEN + 1);
        assert_eq!(validate_tag_name(&name), Err(TagValidationError::NameTooLong));
        assert!(validate_tag_name(&"a".repeat(MAX_TAG_NAME_LEN)).is_ok());
    }

    #[test]
    fn test_control_characters() {
        assert_eq!(
            validate_tag_name("bad\u{7}name"),
            Err(TagValidationError::ControlCharacters)
        );
    }

    #[test]
    fn test_name_key() {
        assert_eq!(name_key(" Work "), name_key("WORK"));
    }

    #[test]
    fn test_into_domain_error() {
        let err: DomainError = TagValidationError::DuplicateName("Work".into()).into();
        assert_eq!(err, DomainError::Validation("tag 'Work' already exists".into()));
    }
}
