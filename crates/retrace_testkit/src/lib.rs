//! # Retrace Testkit
//!
//! Test utilities for retrace.
//!
//! This crate provides:
//! - A tracked `Product` fixture and in-memory context helpers
//! - History types that fail schema validation
//! - Property-based test generators using proptest
//! - A store wrapper that fails or cancels commits on demand
//! - A model-checked harness for operation sequences
//!
//! ## Usage
//!
//! ```rust
//! use retrace_core::Config;
//! use retrace_testkit::prelude::*;
//!
//! let mut harness = HistoryHarness::new(Config::default());
//! harness.apply(&ProductOp::Save(Product::new(1, "A", 10))).unwrap();
//! harness.apply(&ProductOp::Save(Product::new(1, "B", 10))).unwrap();
//! harness.verify();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faulty;
pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faulty::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use faulty::*;
pub use fixtures::*;
pub use generators::*;
pub use integration::*;
