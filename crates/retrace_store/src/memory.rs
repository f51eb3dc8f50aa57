//! In-memory store implementation.

use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::store::{CommitReceipt, Store};
use crate::table::{TableKind, TableSpec};
use crate::types::{CommitSequence, UnitOfWorkId};
use crate::unit_of_work::{PendingWrite, UnitOfWork};
use parking_lot::{Mutex, RwLock};
use retrace_model::{Record, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Rows of one table, keyed by row key (or by sequence for append-only tables).
#[derive(Debug)]
struct Table {
    spec: TableSpec,
    rows: BTreeMap<Value, Record>,
}

/// An in-memory relational store.
///
/// This store keeps all tables in memory and is suitable for:
/// - Unit and integration tests
/// - Embedded use where persistence is handled elsewhere
///
/// # Thread Safety
///
/// Readers share a read lock on the table map. Commits are serialized by a
/// dedicated write lock and apply all staged writes under one exclusive
/// table-map lock, so readers never observe a partially applied commit.
///
/// # Example
///
/// ```rust
/// use retrace_model::{Record, Value};
/// use retrace_store::{InMemoryStore, Store, TableSpec};
///
/// let store = InMemoryStore::new();
/// store.create_table(TableSpec::append_only("log", "seq")).unwrap();
///
/// let mut uow = store.begin().unwrap();
/// uow.append("log", Record::new().with("msg", "hello")).unwrap();
/// let receipt = store.commit(&mut uow).unwrap();
///
/// let row = store.get("log", &Value::Integer(receipt.appended[0] as i64)).unwrap().unwrap();
/// assert_eq!(row.get_as::<String>("msg").unwrap(), "hello");
/// ```
#[derive(Debug)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    next_uow: AtomicU64,
    next_commit: AtomicU64,
    next_row_seq: AtomicU64,
    write_lock: Mutex<()>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            next_uow: AtomicU64::new(1),
            next_commit: AtomicU64::new(1),
            next_row_seq: AtomicU64::new(1),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the sequence of the most recent commit, or 0 if none.
    #[must_use]
    pub fn committed_sequence(&self) -> CommitSequence {
        CommitSequence::new(self.next_commit.load(Ordering::SeqCst) - 1)
    }

    /// Returns the number of committed rows in a table.
    pub fn row_count(&self, table: &str) -> StoreResult<usize> {
        let tables = self.tables.read();
        let table = tables
            .get(table)
            .ok_or_else(|| StoreError::table_not_found(table))?;
        Ok(table.rows.len())
    }

    /// Returns the names of all tables, sorted.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Checks every staged write against committed state.
    fn validate(tables: &HashMap<String, Table>, uow: &UnitOfWork) -> StoreResult<()> {
        for (write_key, write) in uow.pending_writes() {
            let table = tables
                .get(&write_key.table)
                .ok_or_else(|| StoreError::table_not_found(&write_key.table))?;
            let key_field = match &table.spec.kind {
                TableKind::Keyed { key_field } => key_field,
                TableKind::AppendOnly { .. } => {
                    return Err(StoreError::AppendOnly {
                        table: write_key.table.clone(),
                    });
                }
            };

            let exists = table.rows.contains_key(&write_key.key);
            let record = match write {
                PendingWrite::Insert { record } => {
                    if exists {
                        return Err(StoreError::DuplicateKey {
                            table: write_key.table.clone(),
                            key: write_key.key.clone(),
                        });
                    }
                    Some(record)
                }
                PendingWrite::Update { record } => {
                    if !exists {
                        return Err(StoreError::Conflict {
                            table: write_key.table.clone(),
                            key: write_key.key.clone(),
                        });
                    }
                    Some(record)
                }
                PendingWrite::Delete => {
                    if !exists {
                        return Err(StoreError::Conflict {
                            table: write_key.table.clone(),
                            key: write_key.key.clone(),
                        });
                    }
                    None
                }
            };

            if let Some(record) = record {
                if record.get(key_field) != Some(&write_key.key) {
                    return Err(StoreError::KeyMismatch {
                        table: write_key.table.clone(),
                        key: write_key.key.clone(),
                    });
                }
            }
        }

        for append in uow.pending_appends() {
            let table = tables
                .get(&append.table)
                .ok_or_else(|| StoreError::table_not_found(&append.table))?;
            if !table.spec.is_append_only() {
                return Err(StoreError::NotAppendOnly {
                    table: append.table.clone(),
                });
            }
        }

        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for InMemoryStore {
    fn create_table(&self, spec: TableSpec) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if let Some(existing) = tables.get(&spec.name) {
            if existing.spec == spec {
                return Ok(());
            }
            return Err(StoreError::TableExists { table: spec.name });
        }
        debug!(table = %spec.name, append_only = spec.is_append_only(), "created table");
        tables.insert(
            spec.name.clone(),
            Table {
                spec,
                rows: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn table_spec(&self, table: &str) -> StoreResult<TableSpec> {
        self.tables
            .read()
            .get(table)
            .map(|t| t.spec.clone())
            .ok_or_else(|| StoreError::table_not_found(table))
    }

    fn begin(&self) -> StoreResult<UnitOfWork> {
        let id = UnitOfWorkId::new(self.next_uow.fetch_add(1, Ordering::SeqCst));
        Ok(UnitOfWork::new(id))
    }

    fn get(&self, table: &str, key: &Value) -> StoreResult<Option<Record>> {
        let tables = self.tables.read();
        let table = tables
            .get(table)
            .ok_or_else(|| StoreError::table_not_found(table))?;
        Ok(table.rows.get(key).cloned())
    }

    fn query(&self, table: &str, query: &Query) -> StoreResult<Vec<Record>> {
        let tables = self.tables.read();
        let table = tables
            .get(table)
            .ok_or_else(|| StoreError::table_not_found(table))?;
        Ok(query.evaluate(table.rows.values()))
    }

    #[allow(clippy::cast_possible_wrap)]
    fn commit(&self, uow: &mut UnitOfWork) -> StoreResult<CommitReceipt> {
        // Serialize committers
        let _write_guard = self.write_lock.lock();
        uow.ensure_active()?;

        let mut tables = self.tables.write();
        Self::validate(&tables, uow)?;

        let sequence = CommitSequence::new(self.next_commit.fetch_add(1, Ordering::SeqCst));

        // Validation passed, so every lookup below succeeds
        let mut writes = 0;
        for (write_key, write) in uow.pending_writes() {
            let Some(table) = tables.get_mut(&write_key.table) else {
                continue;
            };
            match write {
                PendingWrite::Insert { record } | PendingWrite::Update { record } => {
                    table.rows.insert(write_key.key.clone(), record.clone());
                }
                PendingWrite::Delete => {
                    table.rows.remove(&write_key.key);
                }
            }
            writes += 1;
        }

        let mut appended = Vec::with_capacity(uow.pending_appends().len());
        for append in uow.pending_appends() {
            let Some(table) = tables.get_mut(&append.table) else {
                continue;
            };
            let TableKind::AppendOnly { sequence_field } = &table.spec.kind else {
                continue;
            };
            let seq = self.next_row_seq.fetch_add(1, Ordering::SeqCst);
            let mut record = append.record.clone();
            record.set(sequence_field.clone(), seq as i64);
            table.rows.insert(Value::Integer(seq as i64), record);
            appended.push(seq);
        }

        uow.mark_committed();
        debug!(
            uow = %uow.id(),
            %sequence,
            writes,
            appends = appended.len(),
            "committed unit of work"
        );

        Ok(CommitReceipt {
            sequence,
            writes,
            appended,
        })
    }

    fn abort(&self, uow: &mut UnitOfWork) -> StoreResult<()> {
        uow.ensure_active()?;
        uow.mark_aborted();
        Ok(())
    }
}
