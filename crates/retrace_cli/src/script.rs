//! JSON scripts of catalog operations.
//!
//! A script is a JSON array of steps:
//!
//! ```json
//! [
//!   { "op": "save", "id": 1, "name": "A", "price": 10 },
//!   { "op": "delete", "id": 1 },
//!   { "op": "restore", "id": 1, "version": 1 }
//! ]
//! ```

use crate::catalog::Product;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The file could not be read.
    #[error("cannot read script {path}: {source}")]
    Read {
        /// Script path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid script.
    #[error("invalid script {path}: {source}")]
    Parse {
        /// Script path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// One scripted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Insert the product, or update it if it exists.
    Save(Product),
    /// Delete a product.
    Delete {
        /// Product id.
        id: i64,
    },
    /// Restore a product to a recorded version.
    Restore {
        /// Product id.
        id: i64,
        /// 1-based version.
        version: u32,
    },
}

impl Step {
    /// Id of the product this step touches.
    pub fn product_id(&self) -> i64 {
        match self {
            Step::Save(product) => product.id,
            Step::Delete { id } | Step::Restore { id, .. } => *id,
        }
    }

    /// Short operation name.
    pub fn name(&self) -> &'static str {
        match self {
            Step::Save(_) => "save",
            Step::Delete { .. } => "delete",
            Step::Restore { .. } => "restore",
        }
    }
}

/// Parses a script from JSON text.
pub fn parse(text: &str) -> Result<Vec<Step>, serde_json::Error> {
    serde_json::from_str(text)
}

/// Loads a script file.
pub fn load(path: &Path) -> Result<Vec<Step>, ScriptError> {
    let text = fs::read_to_string(path).map_err(|source| ScriptError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text).map_err(|source| ScriptError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
