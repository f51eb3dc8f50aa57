//! # Retrace Model
//!
//! Field-level data model shared by the retrace store and engine.
//!
//! This crate provides:
//! - [`Value`]: a dynamic, totally ordered field value
//! - [`FieldType`] and [`FieldDef`]: static field declarations used for
//!   schema parity checks
//! - [`Record`]: a named field map, the unit exchanged with the store
//!
//! ## Usage
//!
//! ```
//! use retrace_model::{Record, Value};
//!
//! let record = Record::new()
//!     .with("id", 1i32)
//!     .with("name", "A")
//!     .with("price", 10i64);
//!
//! assert_eq!(record.get("name"), Some(&Value::Text("A".into())));
//! let price: i64 = record.get_as("price").unwrap();
//! assert_eq!(price, 10);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod field;
mod record;
mod value;

pub use error::{ModelError, ModelResult};
pub use field::{find_field, FieldDef, FieldType};
pub use record::Record;
pub use value::{FromValue, Value};
