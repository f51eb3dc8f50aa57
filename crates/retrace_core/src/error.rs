//! Error types for the history engine.

use retrace_model::{ModelError, Value};
use retrace_store::{CommitSequence, StoreError};
use thiserror::Error;

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A history type does not structurally contain its base type.
    ///
    /// Raised while building the registry. Fatal for the affected pair.
    #[error("schema mismatch between {base} and {history}: field `{field}` {reason}")]
    SchemaMismatch {
        /// Base entity type.
        base: &'static str,
        /// History entity type.
        history: &'static str,
        /// Offending field.
        field: String,
        /// What is wrong with the field.
        reason: String,
    },

    /// Two registrations claim the same table.
    #[error("table {table} is registered more than once")]
    DuplicateRegistration {
        /// The contested table name.
        table: String,
    },

    /// No history row exists at the requested position.
    #[error("version {version} not found for {key:?} in {table}")]
    VersionNotFound {
        /// History table searched.
        table: &'static str,
        /// Parent key.
        key: Value,
        /// Requested 1-based version.
        version: u32,
    },

    /// The primary commit succeeded but the history commit failed.
    ///
    /// Base state and history have diverged.
    #[error(
        "history write failed after primary commit {sequence}: {unwritten} history rows not persisted"
    )]
    HistoryPersist {
        /// Sequence of the primary commit that did succeed.
        sequence: CommitSequence,
        /// Number of history rows that were not written.
        unwritten: usize,
        /// The store failure.
        #[source]
        source: StoreError,
    },

    /// The row was changed or removed by another writer.
    #[error("concurrent modification of {key:?} in {table}")]
    ConcurrentModification {
        /// Table of the row.
        table: String,
        /// Row key.
        key: Value,
    },

    /// The live entity does not exist.
    #[error("entity {key:?} not found in {table}")]
    EntityNotFound {
        /// Entity table.
        table: &'static str,
        /// Entity key.
        key: Value,
    },

    /// The entity type was never registered.
    #[error("{type_name} is not registered")]
    NotTracked {
        /// Rust type name.
        type_name: &'static str,
    },

    /// The operation was cancelled before anything was committed.
    #[error("operation cancelled")]
    Cancelled,

    /// A stored row could not be read back as its entity type.
    #[error("invalid record in {table}: {source}")]
    InvalidRecord {
        /// Table the row came from.
        table: String,
        /// Field-level failure.
        #[source]
        source: ModelError,
    },

    /// Ordinary store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Creates a schema mismatch error.
    pub fn schema_mismatch(
        base: &'static str,
        history: &'static str,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::SchemaMismatch {
            base,
            history,
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid record error.
    pub fn invalid_record(table: impl Into<String>, source: ModelError) -> Self {
        Self::InvalidRecord {
            table: table.into(),
            source,
        }
    }

    /// Converts a failed commit into an engine error.
    ///
    /// Store conflicts become [`CoreError::ConcurrentModification`].
    pub fn from_commit(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { table, key } | StoreError::DuplicateKey { table, key } => {
                Self::ConcurrentModification { table, key }
            }
            other => Self::Store(other),
        }
    }

    /// Returns true if the engine considers the operation safe to retry.
    ///
    /// Always false: retrying a two-phase save could append history twice,
    /// so retry policy belongs to the caller.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Returns true if base state and history may have diverged.
    #[must_use]
    pub fn requires_operator_attention(&self) -> bool {
        matches!(self, Self::HistoryPersist { .. })
    }
}
