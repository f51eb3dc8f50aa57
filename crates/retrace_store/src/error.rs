//! Error types for store operations.

use retrace_model::Value;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Table does not exist.
    #[error("table not found: {table}")]
    TableNotFound {
        /// Name of the table.
        table: String,
    },

    /// Table already exists with a different definition.
    #[error("table {table} already exists with a different definition")]
    TableExists {
        /// Name of the table.
        table: String,
    },

    /// Insert of a key that is already present.
    #[error("duplicate key {key:?} in table {table}")]
    DuplicateKey {
        /// Name of the table.
        table: String,
        /// The conflicting key.
        key: Value,
    },

    /// Update or delete of a row that no longer exists.
    ///
    /// This is how a concurrent delete surfaces to a writer that loaded the
    /// row earlier.
    #[error("write conflict on key {key:?} in table {table}")]
    Conflict {
        /// Name of the table.
        table: String,
        /// The key that was expected to exist.
        key: Value,
    },

    /// Update or delete against an append-only table.
    #[error("table {table} is append-only")]
    AppendOnly {
        /// Name of the table.
        table: String,
    },

    /// Append against a keyed table.
    #[error("table {table} is not append-only")]
    NotAppendOnly {
        /// Name of the table.
        table: String,
    },

    /// The key field of a row does not match the key it was written under.
    #[error("row key field does not match key {key:?} in table {table}")]
    KeyMismatch {
        /// Name of the table.
        table: String,
        /// The key the row was written under.
        key: Value,
    },

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// The backing store could not complete the request.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates a table not found error.
    pub fn table_not_found(table: impl Into<String>) -> Self {
        Self::TableNotFound {
            table: table.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Returns true if this error reports a conflicting concurrent write.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. } | StoreError::DuplicateKey { .. })
    }
}
