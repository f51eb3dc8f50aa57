//! Change snapshot collection.

use crate::error::{CoreError, CoreResult};
use retrace_model::{Record, Value};
use retrace_store::{PendingWrite, Store, UnitOfWork};
use std::fmt;

/// Kind of state transition a pending write represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    /// The row is being inserted.
    Created,
    /// The row is being replaced.
    Modified,
    /// The row is being removed.
    Deleted,
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransitionKind::Created => "created",
            TransitionKind::Modified => "modified",
            TransitionKind::Deleted => "deleted",
        })
    }
}

/// Current and last-committed state of one row in a unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSnapshot {
    /// Live table.
    pub table: String,
    /// Row key.
    pub key: Value,
    /// Transition kind.
    pub kind: TransitionKind,
    /// State after the commit. For deletes, the last committed state.
    pub current: Record,
    /// Last committed state. `None` for creates.
    pub original: Option<Record>,
}

/// Captures a snapshot of every keyed write in a unit of work.
///
/// Originals are read from the store's committed state, so this must run
/// before the unit of work is committed. Nothing is written.
///
/// # Errors
///
/// Returns `ConcurrentModification` if an update or delete targets a row
/// that is not committed.
pub fn collect_snapshots<S: Store + ?Sized>(
    store: &S,
    uow: &UnitOfWork,
) -> CoreResult<Vec<ChangeSnapshot>> {
    let mut snapshots = Vec::with_capacity(uow.write_count());
    for (write_key, write) in uow.pending_writes() {
        let snapshot = match write {
            PendingWrite::Insert { record } => ChangeSnapshot {
                table: write_key.table.clone(),
                key: write_key.key.clone(),
                kind: TransitionKind::Created,
                current: record.clone(),
                original: None,
            },
            PendingWrite::Update { record } => {
                let original = load_original(store, &write_key.table, &write_key.key)?;
                ChangeSnapshot {
                    table: write_key.table.clone(),
                    key: write_key.key.clone(),
                    kind: TransitionKind::Modified,
                    current: record.clone(),
                    original: Some(original),
                }
            }
            PendingWrite::Delete => {
                let original = load_original(store, &write_key.table, &write_key.key)?;
                ChangeSnapshot {
                    table: write_key.table.clone(),
                    key: write_key.key.clone(),
                    kind: TransitionKind::Deleted,
                    current: original.clone(),
                    original: Some(original),
                }
            }
        };
        snapshots.push(snapshot);
    }
    Ok(snapshots)
}

fn load_original<S: Store + ?Sized>(store: &S, table: &str, key: &Value) -> CoreResult<Record> {
    store
        .get(table, key)?
        .ok_or_else(|| CoreError::ConcurrentModification {
            table: table.to_string(),
            key: key.clone(),
        })
}
