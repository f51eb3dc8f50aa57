//! Table definitions.

/// How rows of a table are identified and written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableKind {
    /// One row per key; rows may be inserted, updated and deleted.
    Keyed {
        /// Field holding the row key.
        key_field: String,
    },
    /// Rows are only ever appended.
    ///
    /// The store assigns each appended row a strictly increasing sequence
    /// number and writes it into `sequence_field`.
    AppendOnly {
        /// Field receiving the store-assigned sequence.
        sequence_field: String,
    },
}

/// Definition of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    /// Table name.
    pub name: String,
    /// Table kind.
    pub kind: TableKind,
}

impl TableSpec {
    /// Defines a keyed table.
    pub fn keyed(name: impl Into<String>, key_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TableKind::Keyed {
                key_field: key_field.into(),
            },
        }
    }

    /// Defines an append-only table.
    pub fn append_only(name: impl Into<String>, sequence_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TableKind::AppendOnly {
                sequence_field: sequence_field.into(),
            },
        }
    }

    /// Returns true for append-only tables.
    #[must_use]
    pub fn is_append_only(&self) -> bool {
        matches!(self.kind, TableKind::AppendOnly { .. })
    }
}
