//! Property-based test generators using proptest.
//!
//! Names and prices are drawn from small domains so that generated
//! sequences regularly contain saves that change nothing.

use crate::fixtures::Product;
use proptest::prelude::*;

/// Ids used by generated operations.
pub const GENERATED_IDS: std::ops::RangeInclusive<i32> = 1..=3;

/// Strategy for product names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["A", "B", "C"]).prop_map(str::to_string)
}

/// Strategy for product prices.
pub fn price_strategy() -> impl Strategy<Value = i64> {
    prop::sample::select(vec![10i64, 12, 15])
}

/// Strategy for optional descriptions.
pub fn description_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop::sample::select(vec!["new", "used"]).prop_map(str::to_string))
}

/// Strategy for a product with the given id.
pub fn product_strategy(id: i32) -> impl Strategy<Value = Product> {
    (name_strategy(), description_strategy(), price_strategy()).prop_map(
        move |(name, description, price)| Product {
            id,
            name,
            description,
            price,
        },
    )
}

/// A request against the product history API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductOp {
    /// Insert the product, or replace it if it exists.
    Save(Product),
    /// Delete a product.
    Delete {
        /// Product id.
        id: i32,
    },
    /// Restore a product to a version.
    Restore {
        /// Product id.
        id: i32,
        /// 1-based version.
        version: u32,
    },
}

/// Strategy for a single operation.
pub fn op_strategy() -> impl Strategy<Value = ProductOp> {
    prop_oneof![
        4 => GENERATED_IDS.prop_flat_map(product_strategy).prop_map(ProductOp::Save),
        1 => GENERATED_IDS.prop_map(|id| ProductOp::Delete { id }),
        2 => (GENERATED_IDS, 0u32..6).prop_map(|(id, version)| ProductOp::Restore { id, version }),
    ]
}

/// Strategy for a sequence of operations.
pub fn ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<ProductOp>> {
    prop::collection::vec(op_strategy(), 0..max_len)
}
