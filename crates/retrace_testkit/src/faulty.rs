//! Fault injection for store commits.
//!
//! [`FaultyStore`] wraps another store and fails selected commits, so tests
//! can exercise the window between a primary commit and its history commit.
//!
//! ## Usage
//!
//! ```rust
//! use retrace_core::{Config, CoreError, HistoryContext};
//! use retrace_store::InMemoryStore;
//! use retrace_testkit::{product_registry, FaultyStore, Product};
//!
//! let store = FaultyStore::new(InMemoryStore::new());
//! let ctx = HistoryContext::new(store, product_registry(), Config::default()).unwrap();
//!
//! ctx.store().fail_next_commit_to("products_history");
//! let err = ctx.insert(&Product::new(1, "A", 10)).unwrap_err();
//! assert!(err.requires_operator_attention());
//! ```

use parking_lot::Mutex;
use retrace_core::CancellationToken;
use retrace_model::{Record, Value};
use retrace_store::{
    CommitReceipt, Query, Store, StoreError, StoreResult, TableSpec, UnitOfWork,
};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A store wrapper that can fail commits on demand.
#[derive(Debug)]
pub struct FaultyStore<S> {
    inner: S,
    fail_table: Mutex<Option<String>>,
    cancel_after_commit: Mutex<Option<CancellationToken>>,
    commits: AtomicUsize,
    failures: AtomicUsize,
}

impl<S: Store> FaultyStore<S> {
    /// Wraps a store.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_table: Mutex::new(None),
            cancel_after_commit: Mutex::new(None),
            commits: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Fails the next commit that writes to `table`.
    pub fn fail_next_commit_to(&self, table: &str) {
        *self.fail_table.lock() = Some(table.to_string());
    }

    /// Cancels `token` right after the next successful commit.
    pub fn cancel_after_next_commit(&self, token: CancellationToken) {
        *self.cancel_after_commit.lock() = Some(token);
    }

    /// Clears every armed fault.
    pub fn reset(&self) {
        *self.fail_table.lock() = None;
        *self.cancel_after_commit.lock() = None;
    }

    /// Number of successful commits.
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of injected failures.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    fn touches(uow: &UnitOfWork, table: &str) -> bool {
        uow.pending_writes().any(|(key, _)| key.table == table)
            || uow.pending_appends().iter().any(|a| a.table == table)
    }
}

impl<S: Store> Store for FaultyStore<S> {
    fn create_table(&self, spec: TableSpec) -> StoreResult<()> {
        self.inner.create_table(spec)
    }

    fn table_spec(&self, table: &str) -> StoreResult<TableSpec> {
        self.inner.table_spec(table)
    }

    fn begin(&self) -> StoreResult<UnitOfWork> {
        self.inner.begin()
    }

    fn get(&self, table: &str, key: &Value) -> StoreResult<Option<Record>> {
        self.inner.get(table, key)
    }

    fn query(&self, table: &str, query: &Query) -> StoreResult<Vec<Record>> {
        self.inner.query(table, query)
    }

    fn commit(&self, uow: &mut UnitOfWork) -> StoreResult<CommitReceipt> {
        {
            let mut armed = self.fail_table.lock();
            if let Some(table) = armed.as_deref() {
                if Self::touches(uow, table) {
                    let message = format!("simulated commit failure on {table}");
                    *armed = None;
                    self.failures.fetch_add(1, Ordering::SeqCst);
                    return Err(StoreError::unavailable(message));
                }
            }
        }

        let receipt = self.inner.commit(uow)?;
        self.commits.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = self.cancel_after_commit.lock().take() {
            token.cancel();
        }
        Ok(receipt)
    }

    fn abort(&self, uow: &mut UnitOfWork) -> StoreResult<()> {
        self.inner.abort(uow)
    }
}
