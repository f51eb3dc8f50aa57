//! Model-checked integration harness.
//!
//! [`HistoryHarness`] applies [`ProductOp`]s to a real history context and
//! to a plain in-memory model of what the history should contain, then
//! compares the two.

use crate::fixtures::{product_context, Product, ProductHistory};
use crate::generators::ProductOp;
use retrace_core::{
    Config, CoreError, CoreResult, HistoryContext, HistoryId, RestoreOutcome, TimestampPolicy,
};
use retrace_store::InMemoryStore;
use std::collections::BTreeMap;

/// A history context paired with an expected-state model.
///
/// The model assumes versions are numbered in insertion order, which holds
/// for [`TimestampPolicy::EveryTransition`] with a ticking clock.
pub struct HistoryHarness {
    /// The context under test.
    pub ctx: HistoryContext<InMemoryStore>,
    live: BTreeMap<i32, Product>,
    expected: BTreeMap<i32, Vec<Product>>,
}

impl HistoryHarness {
    /// Creates a harness over a fresh product context.
    ///
    /// # Panics
    ///
    /// Panics if `config` does not stamp every transition.
    pub fn new(config: Config) -> Self {
        assert_eq!(
            config.timestamp_policy,
            TimestampPolicy::EveryTransition,
            "the model numbers versions in insertion order"
        );
        Self {
            ctx: product_context(config),
            live: BTreeMap::new(),
            expected: BTreeMap::new(),
        }
    }

    /// Applies one operation to the context and the model.
    ///
    /// Errors the model predicts are swallowed; anything else is returned.
    pub fn apply(&mut self, op: &ProductOp) -> CoreResult<()> {
        match op {
            ProductOp::Save(product) => self.save(product),
            ProductOp::Delete { id } => self.delete(*id),
            ProductOp::Restore { id, version } => self.restore(*id, *version),
        }
    }

    fn save(&mut self, product: &Product) -> CoreResult<()> {
        let report = if self.live.contains_key(&product.id) {
            self.ctx.update(product)?
        } else {
            self.ctx.insert(product)?
        };

        let changed = self.live.get(&product.id) != Some(product);
        assert_eq!(report.history_written(), usize::from(changed));
        if changed {
            self.record(product.clone());
        }
        self.live.insert(product.id, product.clone());
        Ok(())
    }

    fn delete(&mut self, id: i32) -> CoreResult<()> {
        match self.live.remove(&id) {
            Some(last) => {
                let report = self.ctx.delete::<Product>(&id)?;
                assert_eq!(report.history_written(), 1);
                self.record(last);
                Ok(())
            }
            None => match self.ctx.delete::<Product>(&id) {
                Err(CoreError::EntityNotFound { .. }) => Ok(()),
                other => panic!("deleting missing product {id}: {other:?}"),
            },
        }
    }

    fn restore(&mut self, id: i32, version: u32) -> CoreResult<()> {
        let target = self
            .expected
            .get(&id)
            .and_then(|states| states.get((version as usize).checked_sub(1)?))
            .cloned();

        let Some(target) = target else {
            return match self.ctx.restore::<Product>(&id, version) {
                Err(CoreError::VersionNotFound { .. }) => Ok(()),
                other => panic!("restoring missing version {version} of {id}: {other:?}"),
            };
        };

        let restored = self.ctx.restore::<Product>(&id, version)?;
        let expected_outcome = match self.live.get(&id) {
            None => RestoreOutcome::Recreated,
            Some(live) if *live == target => RestoreOutcome::Unchanged,
            Some(_) => RestoreOutcome::Updated,
        };
        assert_eq!(restored.outcome, expected_outcome);
        assert_eq!(restored.entity, target);

        if expected_outcome != RestoreOutcome::Unchanged {
            self.record(target.clone());
        }
        self.live.insert(id, target);
        Ok(())
    }

    fn record(&mut self, state: Product) {
        self.expected.entry(state.id).or_default().push(state);
    }

    /// Every history row currently stored.
    pub fn history_rows(&self) -> Vec<ProductHistory> {
        self.ctx.history::<Product>().expect("read history")
    }

    /// Number of history rows the model expects.
    pub fn expected_rows(&self) -> usize {
        self.expected.values().map(Vec::len).sum()
    }

    /// Checks the context against the model.
    ///
    /// # Panics
    ///
    /// Panics on the first difference.
    pub fn verify(&self) {
        for (id, states) in &self.expected {
            let versions = self.ctx.list_versions::<Product>(id).expect("list versions");
            let numbers: Vec<u32> = versions.iter().map(|v| v.version).collect();
            let expected_numbers: Vec<u32> = (1..).take(states.len()).collect();
            assert_eq!(numbers, expected_numbers, "version numbers of {id}");

            let recorded: Vec<Product> = versions.iter().map(|v| v.record.state()).collect();
            assert_eq!(&recorded, states, "recorded states of {id}");

            for window in versions.windows(2) {
                assert!(window[0].record.created_at < window[1].record.created_at);
            }
        }

        for id in self.expected.keys() {
            let live = self.ctx.get::<Product>(id).expect("read product");
            assert_eq!(live.as_ref(), self.live.get(id), "live state of {id}");
        }

        let rows = self.history_rows();
        assert_eq!(rows.len(), self.expected_rows());
        let ids: Vec<HistoryId> = rows.iter().map(|r| r.history_id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}

/// Asserts that `before` is an unchanged prefix of `after`.
///
/// # Panics
///
/// Panics if any earlier history row was changed or removed.
pub fn assert_append_only(before: &[ProductHistory], after: &[ProductHistory]) {
    assert!(
        after.len() >= before.len(),
        "history shrank from {} to {} rows",
        before.len(),
        after.len()
    );
    assert_eq!(&after[..before.len()], before, "history rows were rewritten");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_tracks_simple_sequence() {
        let mut harness = HistoryHarness::new(Config::default());
        let ops = [
            ProductOp::Save(Product::new(1, "A", 10)),
            ProductOp::Save(Product::new(1, "A", 10)),
            ProductOp::Save(Product::new(1, "B", 10)),
            ProductOp::Delete { id: 1 },
            ProductOp::Restore { id: 1, version: 1 },
            ProductOp::Restore { id: 1, version: 9 },
        ];
        for op in &ops {
            harness.apply(op).unwrap();
        }
        harness.verify();
        assert_eq!(harness.expected_rows(), 4);
    }
}
