//! Store trait definition.

use crate::error::StoreResult;
use crate::query::Query;
use crate::table::TableSpec;
use crate::types::CommitSequence;
use crate::unit_of_work::UnitOfWork;
use retrace_model::{Record, Value};
use std::sync::Arc;

/// Outcome of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Commit sequence assigned to the unit of work.
    pub sequence: CommitSequence,
    /// Number of keyed writes applied.
    pub writes: usize,
    /// Sequences assigned to appended rows, in staging order.
    pub appended: Vec<u64>,
}

/// A relational store with unit-of-work commits.
///
/// # Invariants
///
/// - `commit` applies every staged write or none of them
/// - `get`, `query` and `scan` observe only committed state
/// - sequences assigned to appended rows are strictly increasing across the
///   whole store and never reused
/// - rows of append-only tables are never updated or deleted
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For tests and embedded use
pub trait Store: Send + Sync {
    /// Creates a table.
    ///
    /// Creating a table that already exists with the same definition is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns `TableExists` if the table exists with a different definition.
    fn create_table(&self, spec: TableSpec) -> StoreResult<()>;

    /// Returns the definition of a table.
    fn table_spec(&self, table: &str) -> StoreResult<TableSpec>;

    /// Begins a new unit of work.
    fn begin(&self) -> StoreResult<UnitOfWork>;

    /// Reads one committed row by key.
    ///
    /// For append-only tables the key is the row's sequence number.
    fn get(&self, table: &str, key: &Value) -> StoreResult<Option<Record>>;

    /// Runs a filtered, ordered read over committed rows.
    fn query(&self, table: &str, query: &Query) -> StoreResult<Vec<Record>>;

    /// Returns every committed row of a table in storage order.
    ///
    /// **Warning**: This is a full table scan.
    fn scan(&self, table: &str) -> StoreResult<Vec<Record>> {
        self.query(table, &Query::new())
    }

    /// Commits a unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error and leaves committed state untouched if any staged
    /// write cannot be applied.
    fn commit(&self, uow: &mut UnitOfWork) -> StoreResult<CommitReceipt>;

    /// Aborts a unit of work, discarding its staged writes.
    fn abort(&self, uow: &mut UnitOfWork) -> StoreResult<()>;
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn create_table(&self, spec: TableSpec) -> StoreResult<()> {
        (**self).create_table(spec)
    }

    fn table_spec(&self, table: &str) -> StoreResult<TableSpec> {
        (**self).table_spec(table)
    }

    fn begin(&self) -> StoreResult<UnitOfWork> {
        (**self).begin()
    }

    fn get(&self, table: &str, key: &Value) -> StoreResult<Option<Record>> {
        (**self).get(table, key)
    }

    fn query(&self, table: &str, query: &Query) -> StoreResult<Vec<Record>> {
        (**self).query(table, query)
    }

    fn scan(&self, table: &str) -> StoreResult<Vec<Record>> {
        (**self).scan(table)
    }

    fn commit(&self, uow: &mut UnitOfWork) -> StoreResult<CommitReceipt> {
        (**self).commit(uow)
    }

    fn abort(&self, uow: &mut UnitOfWork) -> StoreResult<()> {
        (**self).abort(uow)
    }
}
