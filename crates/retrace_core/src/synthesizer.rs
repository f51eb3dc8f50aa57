//! History row synthesis.

use crate::config::TimestampPolicy;
use crate::diff::{changed_fields, has_changed};
use crate::error::{CoreError, CoreResult};
use crate::registry::HistoryRegistry;
use crate::snapshot::{ChangeSnapshot, TransitionKind};
use chrono::{DateTime, Utc};
use retrace_model::{Record, Value};
use tracing::debug;

/// An unstored history row.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    /// Append-only table the row goes to.
    pub table: &'static str,
    /// Key of the base entity.
    pub parent_key: Value,
    /// Transition that produced the row.
    pub kind: TransitionKind,
    /// Row contents, without `history_id`.
    pub record: Record,
}

/// Result of synthesizing a whole unit of work.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryBatch {
    /// Rows to append, in snapshot order.
    pub rows: Vec<HistoryRow>,
    /// Snapshots of tracked types skipped because nothing changed.
    pub unchanged: usize,
    /// Snapshots of types without history.
    pub untracked: usize,
}

impl HistoryBatch {
    /// Returns true if there is nothing to append.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Turns change snapshots into history rows.
#[derive(Debug, Clone, Copy)]
pub struct HistorySynthesizer<'a> {
    registry: &'a HistoryRegistry,
    policy: TimestampPolicy,
}

impl<'a> HistorySynthesizer<'a> {
    /// Creates a synthesizer over a validated registry.
    #[must_use]
    pub fn new(registry: &'a HistoryRegistry, policy: TimestampPolicy) -> Self {
        Self { registry, policy }
    }

    /// Builds the history row for one snapshot.
    ///
    /// Returns `None` if the type has no history or nothing changed.
    pub fn synthesize(
        &self,
        snapshot: &ChangeSnapshot,
        now: DateTime<Utc>,
    ) -> CoreResult<Option<HistoryRow>> {
        let Some(binding) = self.registry.history_binding(&snapshot.table) else {
            return Ok(None);
        };
        if !has_changed(snapshot) {
            return Ok(None);
        }

        let created_at = self.stamp(snapshot.kind, now);
        let record = binding
            .synthesize(&snapshot.current, created_at)
            .map_err(|e| CoreError::invalid_record(snapshot.table.clone(), e))?;

        Ok(Some(HistoryRow {
            table: binding.table,
            parent_key: snapshot.key.clone(),
            kind: snapshot.kind,
            record,
        }))
    }

    /// Builds history rows for every snapshot of a unit of work.
    pub fn synthesize_all(
        &self,
        snapshots: &[ChangeSnapshot],
        now: DateTime<Utc>,
    ) -> CoreResult<HistoryBatch> {
        let mut batch = HistoryBatch::default();
        for snapshot in snapshots {
            if self.registry.history_binding(&snapshot.table).is_none() {
                batch.untracked += 1;
                continue;
            }
            match self.synthesize(snapshot, now)? {
                Some(row) => {
                    debug!(
                        table = %snapshot.table,
                        key = ?snapshot.key,
                        kind = %snapshot.kind,
                        fields = ?changed_fields(snapshot),
                        "history row synthesized"
                    );
                    batch.rows.push(row);
                }
                None => {
                    debug!(
                        table = %snapshot.table,
                        key = ?snapshot.key,
                        "skipping unchanged snapshot"
                    );
                    batch.unchanged += 1;
                }
            }
        }
        Ok(batch)
    }

    fn stamp(&self, kind: TransitionKind, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match (self.policy, kind) {
            (TimestampPolicy::EveryTransition, _)
            | (TimestampPolicy::CreateOnly, TransitionKind::Created) => Some(now),
            (TimestampPolicy::CreateOnly, _) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, CREATED_AT_FIELD, HISTORY_ID_FIELD};
    use crate::fixtures::{Note, Tag};
    use chrono::TimeZone;

    fn registry() -> HistoryRegistry {
        HistoryRegistry::builder()
            .register::<Note>()
            .register_untracked::<Tag>()
            .build()
            .unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn snapshot(kind: TransitionKind, current: &Note, original: Option<&Note>) -> ChangeSnapshot {
        ChangeSnapshot {
            table: Note::TABLE.into(),
            key: Value::Integer(current.id),
            kind,
            current: current.to_record(),
            original: original.map(Note::to_record),
        }
    }

    #[test]
    fn create_produces_stamped_row() {
        let registry = registry();
        let synth = HistorySynthesizer::new(&registry, TimestampPolicy::EveryTransition);
        let note = Note::new(1, "A");

        let row = synth
            .synthesize(&snapshot(TransitionKind::Created, &note, None), now())
            .unwrap()
            .unwrap();
        assert_eq!(row.table, "notes_history");
        assert_eq!(row.parent_key, Value::Integer(1));
        assert_eq!(row.record.get(CREATED_AT_FIELD), Some(&Value::Timestamp(now())));
        assert_eq!(row.record.get_as::<String>("title").unwrap(), "A");
        assert!(!row.record.contains(HISTORY_ID_FIELD));
    }

    #[test]
    fn unchanged_update_produces_nothing() {
        let registry = registry();
        let synth = HistorySynthesizer::new(&registry, TimestampPolicy::EveryTransition);
        let note = Note::new(1, "A");

        let snap = snapshot(TransitionKind::Modified, &note, Some(&note));
        assert!(synth.synthesize(&snap, now()).unwrap().is_none());
    }

    #[test]
    fn create_only_policy_leaves_updates_unstamped() {
        let registry = registry();
        let synth = HistorySynthesizer::new(&registry, TimestampPolicy::CreateOnly);
        let before = Note::new(1, "A");
        let after = Note::new(1, "B");

        let row = synth
            .synthesize(&snapshot(TransitionKind::Modified, &after, Some(&before)), now())
            .unwrap()
            .unwrap();
        assert_eq!(row.record.get(CREATED_AT_FIELD), Some(&Value::Null));

        let row = synth
            .synthesize(&snapshot(TransitionKind::Deleted, &after, Some(&after)), now())
            .unwrap()
            .unwrap();
        assert_eq!(row.record.get(CREATED_AT_FIELD), Some(&Value::Null));
    }

    #[test]
    fn batch_counts_skips() {
        let registry = registry();
        let synth = HistorySynthesizer::new(&registry, TimestampPolicy::EveryTransition);
        let a = Note::new(1, "A");
        let b = Note::new(2, "B");
        let tag = ChangeSnapshot {
            table: Tag::TABLE.into(),
            key: Value::Text("x".into()),
            kind: TransitionKind::Created,
            current: Tag { name: "x".into() }.to_record(),
            original: None,
        };

        let batch = synth
            .synthesize_all(
                &[
                    snapshot(TransitionKind::Created, &a, None),
                    snapshot(TransitionKind::Modified, &b, Some(&b)),
                    tag,
                ],
                now(),
            )
            .unwrap();
        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.unchanged, 1);
        assert_eq!(batch.untracked, 1);
    }

    #[test]
    fn malformed_row_is_invalid_record() {
        let registry = registry();
        let synth = HistorySynthesizer::new(&registry, TimestampPolicy::EveryTransition);
        let snap = ChangeSnapshot {
            table: Note::TABLE.into(),
            key: Value::Integer(1),
            kind: TransitionKind::Created,
            current: Record::new().with("id", 1i64),
            original: None,
        };
        assert!(matches!(
            synth.synthesize(&snap, now()),
            Err(CoreError::InvalidRecord { .. })
        ));
    }
}
