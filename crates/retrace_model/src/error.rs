//! Error types for record access.

use crate::field::FieldType;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur when reading typed values out of a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A required field is absent or null.
    #[error("missing field '{field}'")]
    MissingField {
        /// Name of the field.
        field: String,
    },

    /// A field holds a value of the wrong type.
    #[error("field '{field}' has type {found}, expected {expected}")]
    FieldType {
        /// Name of the field.
        field: String,
        /// Declared type.
        expected: FieldType,
        /// Type actually found.
        found: FieldType,
    },
}

impl ModelError {
    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates a field type error.
    pub fn field_type(field: impl Into<String>, expected: FieldType, found: FieldType) -> Self {
        Self::FieldType {
            field: field.into(),
            expected,
            found,
        }
    }
}
