//! Unit of work state.

use crate::error::{StoreError, StoreResult};
use crate::types::UnitOfWorkId;
use retrace_model::{Record, Value};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// State of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkState {
    /// Unit of work is active and can stage writes.
    Active,
    /// Unit of work has been committed.
    Committed,
    /// Unit of work has been aborted.
    Aborted,
}

/// Identifies the row a pending write targets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WriteKey {
    /// Table name.
    pub table: String,
    /// Row key.
    pub key: Value,
}

/// A pending write to a keyed table.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingWrite {
    /// Insert a new row.
    Insert {
        /// Full row contents.
        record: Record,
    },
    /// Replace an existing row.
    Update {
        /// Full row contents.
        record: Record,
    },
    /// Delete an existing row.
    Delete,
}

/// A pending append to an append-only table.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAppend {
    /// Table name.
    pub table: String,
    /// Row contents; the sequence field is assigned at commit.
    pub record: Record,
}

/// An in-flight set of changes.
///
/// Writes are staged here and become visible only when a store commits the
/// unit of work. Staging the same row twice merges the two writes:
///
/// | staged | then | result |
/// |--------|------|--------|
/// | insert | update | insert (new contents) |
/// | insert | delete | nothing |
/// | delete | insert | update |
/// | update | delete | delete |
#[derive(Debug)]
pub struct UnitOfWork {
    id: UnitOfWorkId,
    state: UnitOfWorkState,
    writes: BTreeMap<WriteKey, PendingWrite>,
    appends: Vec<PendingAppend>,
}

impl UnitOfWork {
    /// Creates a new unit of work.
    ///
    /// Called by store implementations from [`crate::Store::begin`].
    #[must_use]
    pub fn new(id: UnitOfWorkId) -> Self {
        Self {
            id,
            state: UnitOfWorkState::Active,
            writes: BTreeMap::new(),
            appends: Vec::new(),
        }
    }

    /// Returns the unit of work ID.
    #[must_use]
    pub fn id(&self) -> UnitOfWorkId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> UnitOfWorkState {
        self.state
    }

    /// Checks if the unit of work is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == UnitOfWorkState::Active
    }

    /// Stages an insert.
    pub fn insert(
        &mut self,
        table: impl Into<String>,
        key: Value,
        record: Record,
    ) -> StoreResult<()> {
        self.ensure_active()?;
        let write_key = WriteKey {
            table: table.into(),
            key,
        };
        match self.writes.entry(write_key) {
            Entry::Occupied(mut slot) => {
                let merged = match slot.get() {
                    PendingWrite::Delete => PendingWrite::Update { record },
                    PendingWrite::Insert { .. } | PendingWrite::Update { .. } => {
                        return Err(StoreError::DuplicateKey {
                            table: slot.key().table.clone(),
                            key: slot.key().key.clone(),
                        });
                    }
                };
                slot.insert(merged);
            }
            Entry::Vacant(slot) => {
                slot.insert(PendingWrite::Insert { record });
            }
        }
        Ok(())
    }

    /// Stages an update.
    pub fn update(
        &mut self,
        table: impl Into<String>,
        key: Value,
        record: Record,
    ) -> StoreResult<()> {
        self.ensure_active()?;
        let write_key = WriteKey {
            table: table.into(),
            key,
        };
        match self.writes.entry(write_key) {
            Entry::Occupied(mut slot) => {
                let merged = match slot.get() {
                    PendingWrite::Insert { .. } => PendingWrite::Insert { record },
                    PendingWrite::Update { .. } => PendingWrite::Update { record },
                    PendingWrite::Delete => {
                        return Err(StoreError::Conflict {
                            table: slot.key().table.clone(),
                            key: slot.key().key.clone(),
                        });
                    }
                };
                slot.insert(merged);
            }
            Entry::Vacant(slot) => {
                slot.insert(PendingWrite::Update { record });
            }
        }
        Ok(())
    }

    /// Stages a delete.
    pub fn delete(&mut self, table: impl Into<String>, key: Value) -> StoreResult<()> {
        self.ensure_active()?;
        let write_key = WriteKey {
            table: table.into(),
            key,
        };
        match self.writes.get(&write_key) {
            Some(PendingWrite::Insert { .. }) => {
                self.writes.remove(&write_key);
            }
            _ => {
                self.writes.insert(write_key, PendingWrite::Delete);
            }
        }
        Ok(())
    }

    /// Stages an append to an append-only table.
    pub fn append(&mut self, table: impl Into<String>, record: Record) -> StoreResult<()> {
        self.ensure_active()?;
        self.appends.push(PendingAppend {
            table: table.into(),
            record,
        });
        Ok(())
    }

    /// Gets a pending write for a row.
    #[must_use]
    pub fn get_pending_write(&self, table: &str, key: &Value) -> Option<&PendingWrite> {
        self.writes.get(&WriteKey {
            table: table.to_string(),
            key: key.clone(),
        })
    }

    /// Returns all pending keyed writes, ordered by table then key.
    pub fn pending_writes(&self) -> impl Iterator<Item = (&WriteKey, &PendingWrite)> {
        self.writes.iter()
    }

    /// Returns all pending appends in staging order.
    pub fn pending_appends(&self) -> &[PendingAppend] {
        &self.appends
    }

    /// Returns the number of pending writes and appends.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.len() + self.appends.len()
    }

    /// Returns true if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.write_count() == 0
    }

    /// Marks the unit of work as committed.
    ///
    /// Called by store implementations once every write has been applied.
    pub fn mark_committed(&mut self) {
        self.state = UnitOfWorkState::Committed;
    }

    /// Marks the unit of work as aborted.
    pub fn mark_aborted(&mut self) {
        self.state = UnitOfWorkState::Aborted;
    }

    /// Ensures the unit of work is active.
    pub fn ensure_active(&self) -> StoreResult<()> {
        match self.state {
            UnitOfWorkState::Active => Ok(()),
            UnitOfWorkState::Committed => Err(StoreError::invalid_operation(
                "unit of work already committed",
            )),
            UnitOfWorkState::Aborted => {
                Err(StoreError::invalid_operation("unit of work already aborted"))
            }
        }
    }
}
