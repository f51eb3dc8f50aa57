//! Restoring live entities from history.

use crate::context::SaveReport;
use crate::entity::{HasHistory, HistoryEntity};
use std::fmt;

/// What a restore did to the live entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The entity did not exist and was inserted.
    Recreated,
    /// The entity existed and its fields were overwritten.
    Updated,
    /// The entity already matched the target version.
    Unchanged,
}

impl fmt::Display for RestoreOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RestoreOutcome::Recreated => "recreated",
            RestoreOutcome::Updated => "updated",
            RestoreOutcome::Unchanged => "unchanged",
        })
    }
}

/// Result of a restore.
#[derive(Debug, Clone)]
pub struct RestoredEntity<T> {
    /// The live entity after the restore.
    pub entity: T,
    /// What happened to it.
    pub outcome: RestoreOutcome,
    /// The version that was restored.
    pub version: u32,
    /// The save that applied the restore.
    pub report: SaveReport,
}

/// Computes the live entity a restore should write.
///
/// With no live entity the target is rebuilt from history. Otherwise the
/// target's fields are applied to the live entity.
pub fn plan_restore<T: HasHistory>(target: &T::History, live: Option<T>) -> (T, RestoreOutcome) {
    match live {
        None => (target.to_base(), RestoreOutcome::Recreated),
        Some(mut entity) => {
            let before = entity.to_record();
            target.apply_to(&mut entity);
            let outcome = if entity.to_record() == before {
                RestoreOutcome::Unchanged
            } else {
                RestoreOutcome::Updated
            };
            (entity, outcome)
        }
    }
}
