//! Demo command implementation.

use super::run::{execute, print};
use crate::catalog::Product;
use crate::script::Step;
use retrace_core::Config;

/// The built-in walkthrough: create, rename, save unchanged, reprice,
/// delete, then bring the first version back.
pub fn steps() -> Vec<Step> {
    let product = |name: &str, price: i64| {
        Step::Save(Product {
            id: 1,
            name: name.to_string(),
            description: None,
            price,
        })
    };
    vec![
        product("A", 10),
        product("B", 10),
        product("B", 10),
        product("B", 12),
        Step::Delete { id: 1 },
        Step::Restore { id: 1, version: 1 },
    ]
}

/// Runs the demo command.
pub fn run(config: Config, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let summary = execute(&steps(), config)?;
    print(&summary, format)
}
