//! Benchmark utilities.

use rand::Rng;
use retrace_core::{Config, HistoryContext};
use retrace_store::InMemoryStore;
use retrace_testkit::{product_context, Product};

/// A random product with the given id.
pub fn random_product(id: i32) -> Product {
    let mut rng = rand::thread_rng();
    let name: String = (0..8).map(|_| rng.gen_range(b'a'..=b'z') as char).collect();
    Product::new(id, &name, rng.gen_range(100..10_000))
}

/// A context holding `entities` products with `versions` recorded states each.
pub fn populated_context(
    config: Config,
    entities: i32,
    versions: usize,
) -> HistoryContext<InMemoryStore> {
    let ctx = product_context(config);
    for id in 1..=entities {
        ctx.insert(&random_product(id)).expect("insert");
    }
    for _ in 1..versions {
        for id in 1..=entities {
            ctx.update(&random_product(id)).expect("update");
        }
    }
    ctx
}
