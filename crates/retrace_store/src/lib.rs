//! # Retrace Store
//!
//! The persistence contract consumed by the retrace engine, and an in-memory
//! relational implementation of it.
//!
//! ## Design Principles
//!
//! - Writes are staged in a [`UnitOfWork`] and applied atomically by
//!   [`Store::commit`]
//! - Tables are either keyed (one row per key) or append-only (rows are
//!   numbered by a store-assigned, strictly increasing sequence and can never
//!   be updated or deleted)
//! - Filtering and ordering run inside the store through [`Query`]
//! - Stores must be `Send + Sync` for concurrent access
//!
//! ## Example
//!
//! ```rust
//! use retrace_model::{Record, Value};
//! use retrace_store::{InMemoryStore, Store, TableSpec};
//!
//! let store = InMemoryStore::new();
//! store.create_table(TableSpec::keyed("products", "id")).unwrap();
//!
//! let mut uow = store.begin().unwrap();
//! let row = Record::new().with("id", 1i32).with("name", "A");
//! uow.insert("products", Value::from(1i32), row).unwrap();
//! store.commit(&mut uow).unwrap();
//!
//! assert!(store.get("products", &Value::from(1i32)).unwrap().is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod query;
mod store;
mod table;
mod types;
mod unit_of_work;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use query::{Filter, Order, OrderBy, Query};
pub use store::{CommitReceipt, Store};
pub use table::{TableKind, TableSpec};
pub use types::{CommitSequence, UnitOfWorkId};
pub use unit_of_work::{PendingAppend, PendingWrite, UnitOfWork, UnitOfWorkState, WriteKey};
