//! Error types for the registry.

use monkeyreg_storage::StorageError;
use thiserror::Error;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// A record failed validation.
///
/// Validation errors are never retried and never coerced: the caller
/// must supply different input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Trimmed name length is outside 2-40 characters.
    #[error("name must be 2-40 characters, got {length}")]
    InvalidName {
        /// Length of the trimmed name, in characters.
        length: usize,
    },

    /// Category is not one of the fixed set.
    #[error("category must be one of: capuchin, macaque, marmoset, howler (got {value:?})")]
    InvalidCategory {
        /// The rejected input.
        value: String,
    },

    /// Age is outside the range allowed for the category.
    #[error("age must be between 0 and {max} for {category}, got {age}")]
    InvalidAge {
        /// The rejected age.
        age: i64,
        /// Highest age allowed for the category.
        max: u32,
        /// Canonical category name.
        category: &'static str,
    },

    /// `last_check_time` is not an ISO-8601 timestamp.
    #[error("last_check_time must be ISO-8601, got {value:?}")]
    InvalidTimestamp {
        /// The rejected input.
        value: String,
    },

    /// A required field is absent from a raw mapping.
    #[error("missing required field: {field}")]
    MissingField {
        /// Field name.
        field: &'static str,
    },

    /// A field has the wrong type in a raw mapping.
    #[error("field {field} must be {expected}")]
    InvalidType {
        /// Field name.
        field: &'static str,
        /// Expected type description.
        expected: &'static str,
    },
}

/// Errors that can occur in registry operations.
///
/// A missing record is not an error: `get`, `update` and `delete`
/// report it through `Option`/`bool` outcomes.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The record failed validation.
    #[error("invalid record: {0}")]
    Validation(#[from] ValidationError),

    /// Another record already has this name within the category.
    #[error("duplicate name within category: {name:?} already exists as {category}")]
    DuplicateName {
        /// The conflicting name.
        name: String,
        /// Canonical category.
        category: String,
    },

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The registry could not be set up as configured.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// A bulk import source could not be used.
    #[error("invalid import source: {message}")]
    InvalidImport {
        /// Description of the problem.
        message: String,
    },
}

impl RegistryError {
    /// Creates a duplicate name error.
    pub fn duplicate_name(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self::DuplicateName {
            name: name.into(),
            category: category.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an invalid import error.
    pub fn invalid_import(message: impl Into<String>) -> Self {
        Self::InvalidImport {
            message: message.into(),
        }
    }

    /// Returns true for duplicate names and duplicate ids.
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            RegistryError::DuplicateName { .. }
                | RegistryError::Storage(StorageError::DuplicateId { .. })
        )
    }

    /// Returns true if the input failed validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, RegistryError::Validation(_))
    }

    /// Returns the validation failure, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            RegistryError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_predicates() {
        assert!(RegistryError::duplicate_name("luna", "marmoset").is_duplicate());
        assert!(RegistryError::Storage(StorageError::duplicate_id("m1")).is_duplicate());
        assert!(!RegistryError::invalid_config("nope").is_duplicate());
    }

    #[test]
    fn validation_predicates() {
        let err: RegistryError = ValidationError::InvalidName { length: 1 }.into();
        assert!(err.is_validation());
        assert_eq!(
            err.as_validation(),
            Some(&ValidationError::InvalidName { length: 1 })
        );
        assert!(!RegistryError::duplicate_name("luna", "marmoset").is_validation());
    }

    #[test]
    fn error_display() {
        let err = ValidationError::InvalidAge {
            age: 23,
            max: 22,
            category: "marmoset",
        };
        assert_eq!(
            err.to_string(),
            "age must be between 0 and 22 for marmoset, got 23"
        );

        let err = RegistryError::duplicate_name("luna", "marmoset");
        assert!(err.to_string().contains("duplicate name"));
    }
}
