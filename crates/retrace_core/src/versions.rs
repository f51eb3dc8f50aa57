//! Version numbering over history rows.
//!
//! A version is the 1-based position of a history row among all rows of the
//! same parent, ordered by `created_at` and then `history_id`. Versions are
//! computed on every query and never stored.

use crate::config::VersionStrategy;
use crate::entity::{Entity, EntityKey, HistoryEntity, CREATED_AT_FIELD, HISTORY_ID_FIELD};
use crate::error::{CoreError, CoreResult};
use retrace_model::Record;
use retrace_store::{Order, Query, Store};
use std::collections::BTreeMap;

/// A history row labelled with its version number.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedEntity<H> {
    /// 1-based version.
    pub version: u32,
    /// The history row.
    pub record: H,
}

type KeyOf<H> = <<H as HistoryEntity>::Base as Entity>::Key;

/// Numbers rows that are already in version order.
pub fn number<H>(rows: impl IntoIterator<Item = H>) -> Vec<VersionedEntity<H>> {
    rows.into_iter()
        .zip(1..)
        .map(|(record, version)| VersionedEntity { version, record })
        .collect()
}

/// Sorts history rows into version order.
pub fn sort_versions<H: HistoryEntity>(rows: &mut [H]) {
    rows.sort_by_key(|h| (h.created_at(), h.history_id()));
}

/// Query selecting the rows of one parent in version order.
#[must_use]
pub fn version_query<H: HistoryEntity>(key: &KeyOf<H>) -> Query {
    Query::new()
        .filter_eq(<H::Base as Entity>::KEY_FIELD, key.to_value())
        .order_by(CREATED_AT_FIELD, Order::Asc)
        .order_by(HISTORY_ID_FIELD, Order::Asc)
}

/// Runs version queries against a store.
#[derive(Debug, Clone, Copy)]
pub struct VersionQuery<'a, S: Store + ?Sized> {
    store: &'a S,
    strategy: VersionStrategy,
}

impl<'a, S: Store + ?Sized> VersionQuery<'a, S> {
    /// Creates a version query.
    #[must_use]
    pub fn new(store: &'a S, strategy: VersionStrategy) -> Self {
        Self { store, strategy }
    }

    /// Lists every version of one parent.
    ///
    /// An unknown parent has no versions.
    pub fn list<H: HistoryEntity>(&self, key: &KeyOf<H>) -> CoreResult<Vec<VersionedEntity<H>>> {
        match self.strategy {
            VersionStrategy::Pushdown => {
                let rows = self.store.query(H::TABLE, &version_query::<H>(key))?;
                Ok(number(parse::<H>(rows)?))
            }
            VersionStrategy::Eager => Ok(self.all::<H>()?.remove(key).unwrap_or_default()),
        }
    }

    /// Finds one version of one parent.
    ///
    /// # Errors
    ///
    /// Returns `VersionNotFound` if `version` is 0 or past the last version.
    pub fn find<H: HistoryEntity>(&self, key: &KeyOf<H>, version: u32) -> CoreResult<H> {
        let not_found = || CoreError::VersionNotFound {
            table: H::TABLE,
            key: key.to_value(),
            version,
        };
        let Some(index) = version.checked_sub(1) else {
            return Err(not_found());
        };

        let found = match self.strategy {
            VersionStrategy::Pushdown => {
                let query = version_query::<H>(key).offset(index as usize).limit(1);
                parse::<H>(self.store.query(H::TABLE, &query)?)?.into_iter().next()
            }
            VersionStrategy::Eager => self
                .list::<H>(key)?
                .into_iter()
                .nth(index as usize)
                .map(|v| v.record),
        };
        found.ok_or_else(not_found)
    }

    /// Lists every version of every parent, grouped by parent.
    ///
    /// Always loads the whole history table.
    pub fn all<H: HistoryEntity>(&self) -> CoreResult<BTreeMap<KeyOf<H>, Vec<VersionedEntity<H>>>> {
        let mut groups: BTreeMap<KeyOf<H>, Vec<H>> = BTreeMap::new();
        for row in self.rows::<H>()? {
            groups.entry(row.parent_key()).or_default().push(row);
        }
        Ok(groups
            .into_iter()
            .map(|(key, mut rows)| {
                sort_versions(&mut rows);
                (key, number(rows))
            })
            .collect())
    }

    /// Every history row, in insertion order, unnumbered.
    pub fn rows<H: HistoryEntity>(&self) -> CoreResult<Vec<H>> {
        parse(self.store.scan(H::TABLE)?)
    }

    /// Every history row of one parent, in insertion order, unnumbered.
    pub fn rows_of<H: HistoryEntity>(&self, key: &KeyOf<H>) -> CoreResult<Vec<H>> {
        let query = Query::new()
            .filter_eq(<H::Base as Entity>::KEY_FIELD, key.to_value())
            .order_by(HISTORY_ID_FIELD, Order::Asc);
        parse(self.store.query(H::TABLE, &query)?)
    }
}

fn parse<H: HistoryEntity>(records: Vec<Record>) -> CoreResult<Vec<H>> {
    records
        .iter()
        .map(|r| H::from_record(r).map_err(|e| CoreError::invalid_record(H::TABLE, e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::HistoryId;
    use crate::fixtures::{Note, NoteHistory};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use retrace_store::{InMemoryStore, TableSpec};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .create_table(TableSpec::append_only(NoteHistory::TABLE, HISTORY_ID_FIELD))
            .unwrap();
        store
    }

    fn append(store: &InMemoryStore, rows: &[(i64, &str, Option<i64>)]) {
        let mut uow = store.begin().unwrap();
        for (id, title, at) in rows {
            let history = NoteHistory::from_base(&Note::new(*id, title), at.map(t));
            let mut record = history.to_record();
            record.remove(HISTORY_ID_FIELD);
            uow.append(NoteHistory::TABLE, record).unwrap();
        }
        store.commit(&mut uow).unwrap();
    }

    fn titles(versions: &[VersionedEntity<NoteHistory>]) -> Vec<(u32, String)> {
        versions
            .iter()
            .map(|v| (v.version, v.record.title.clone()))
            .collect()
    }

    #[test]
    fn list_orders_by_created_at() {
        let store = store();
        append(
            &store,
            &[(1, "A", Some(0)), (2, "X", Some(1)), (1, "C", Some(5)), (1, "B", Some(3))],
        );

        for strategy in [VersionStrategy::Pushdown, VersionStrategy::Eager] {
            let query = VersionQuery::new(&store, strategy);
            let versions = query.list::<NoteHistory>(&1).unwrap();
            assert_eq!(
                titles(&versions),
                vec![(1, "A".into()), (2, "B".into()), (3, "C".into())]
            );
        }
    }

    #[test]
    fn ties_break_by_history_id() {
        let store = store();
        append(&store, &[(1, "first", Some(0)), (1, "second", Some(0))]);

        let versions = VersionQuery::new(&store, VersionStrategy::Pushdown)
            .list::<NoteHistory>(&1)
            .unwrap();
        assert_eq!(versions[0].record.title, "first");
        assert!(versions[0].record.history_id < versions[1].record.history_id);
    }

    #[test]
    fn unstamped_rows_sort_first() {
        let store = store();
        append(&store, &[(1, "created", Some(10)), (1, "updated", None)]);

        let versions = VersionQuery::new(&store, VersionStrategy::Eager)
            .list::<NoteHistory>(&1)
            .unwrap();
        assert_eq!(
            titles(&versions),
            vec![(1, "updated".into()), (2, "created".into())]
        );
    }

    #[test]
    fn find_out_of_range() {
        let store = store();
        append(&store, &[(1, "A", Some(0))]);

        for strategy in [VersionStrategy::Pushdown, VersionStrategy::Eager] {
            let query = VersionQuery::new(&store, strategy);
            assert_eq!(query.find::<NoteHistory>(&1, 1).unwrap().title, "A");
            for version in [0, 2] {
                assert!(matches!(
                    query.find::<NoteHistory>(&1, version),
                    Err(CoreError::VersionNotFound { .. })
                ));
            }
            assert!(query.find::<NoteHistory>(&7, 1).is_err());
            assert!(query.list::<NoteHistory>(&7).unwrap().is_empty());
        }
    }

    #[test]
    fn all_groups_by_parent() {
        let store = store();
        append(&store, &[(2, "X", Some(0)), (1, "A", Some(1)), (2, "Y", Some(2))]);

        let all = VersionQuery::new(&store, VersionStrategy::Pushdown)
            .all::<NoteHistory>()
            .unwrap();
        assert_eq!(all.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(titles(&all[&2]), vec![(1, "X".into()), (2, "Y".into())]);
    }

    #[test]
    fn raw_rows() {
        let store = store();
        append(&store, &[(2, "X", Some(9)), (1, "A", Some(1)), (2, "Y", Some(2))]);
        let query = VersionQuery::new(&store, VersionStrategy::Pushdown);

        assert_eq!(query.rows::<NoteHistory>().unwrap().len(), 3);
        let rows = query.rows_of::<NoteHistory>(&2).unwrap();
        let ids: Vec<HistoryId> = rows.iter().map(|r| r.history_id).collect();
        assert_eq!(ids, vec![HistoryId::new(1), HistoryId::new(3)]);
    }

    proptest! {
        #[test]
        fn strategies_agree(rows in prop::collection::vec((1i64..4, prop::option::of(0i64..5)), 0..30)) {
            let store = store();
            let rows: Vec<(i64, &str, Option<i64>)> =
                rows.into_iter().map(|(id, at)| (id, "n", at)).collect();
            if !rows.is_empty() {
                append(&store, &rows);
            }

            let pushdown = VersionQuery::new(&store, VersionStrategy::Pushdown);
            let eager = VersionQuery::new(&store, VersionStrategy::Eager);
            for id in 1i64..4 {
                let a = pushdown.list::<NoteHistory>(&id).unwrap();
                let b = eager.list::<NoteHistory>(&id).unwrap();
                prop_assert_eq!(&a, &b);
                for v in &a {
                    prop_assert_eq!(&pushdown.find::<NoteHistory>(&id, v.version).unwrap(), &v.record);
                    prop_assert_eq!(&eager.find::<NoteHistory>(&id, v.version).unwrap(), &v.record);
                }
            }
        }
    }
}
