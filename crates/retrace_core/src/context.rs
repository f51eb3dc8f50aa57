//! The history context: a store wrapper whose saves record history.

use crate::cancel::CancellationToken;
use crate::clock::{Clock, SystemClock};
use crate::config::{CommitMode, Config};
use crate::entity::{Entity, EntityKey, HasHistory, HistoryId};
use crate::error::{CoreError, CoreResult};
use crate::registry::HistoryRegistry;
use crate::restore::{plan_restore, RestoreOutcome, RestoredEntity};
use crate::snapshot::collect_snapshots;
use crate::synthesizer::{HistoryBatch, HistorySynthesizer};
use crate::versions::{VersionQuery, VersionedEntity};
use retrace_store::{CommitSequence, Store, StoreError, UnitOfWork};
use std::any::type_name;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    /// Sequence of the primary commit.
    pub sequence: CommitSequence,
    /// Sequence of the commit that wrote history, if any history was written.
    ///
    /// Equal to `sequence` in atomic mode.
    pub history_sequence: Option<CommitSequence>,
    /// Number of keyed writes snapshotted.
    pub snapshots: usize,
    /// Tracked writes skipped because nothing changed.
    pub unchanged: usize,
    /// IDs of the history rows written, in snapshot order.
    pub history_ids: Vec<HistoryId>,
    /// Cancellation was requested after the primary commit succeeded.
    ///
    /// History was still written.
    pub cancelled_after_commit: bool,
}

impl SaveReport {
    /// Number of history rows written.
    #[must_use]
    pub fn history_written(&self) -> usize {
        self.history_ids.len()
    }
}

/// Wraps a store so that every save of a tracked entity appends history.
///
/// Each save runs the same pipeline: collect snapshots of the unit of work,
/// drop the ones whose fields did not change, synthesize history rows, then
/// commit. In [`CommitMode::TwoPhase`] the history rows go out in a second
/// commit after the primary one; in [`CommitMode::Atomic`] both go out in
/// one.
///
/// # Example
///
/// ```rust,ignore
/// let ctx = HistoryContext::new(
///     InMemoryStore::new(),
///     HistoryRegistry::builder().register::<Product>().build()?,
///     Config::default(),
/// )?;
///
/// ctx.insert(&Product::new(1, "A", 10))?;
/// ctx.update(&Product::new(1, "B", 10))?;
///
/// let versions = ctx.list_versions::<Product>(&1)?;
/// assert_eq!(versions.len(), 2);
///
/// ctx.restore::<Product>(&1, 1)?;
/// ```
#[derive(Debug)]
pub struct HistoryContext<S: Store> {
    store: S,
    registry: HistoryRegistry,
    config: Config,
    clock: Arc<dyn Clock>,
}

impl<S: Store> HistoryContext<S> {
    /// Creates a context and the tables of every registered type.
    pub fn new(store: S, registry: HistoryRegistry, config: Config) -> CoreResult<Self> {
        Self::with_clock(store, registry, config, Arc::new(SystemClock))
    }

    /// Creates a context with a custom clock.
    pub fn with_clock(
        store: S,
        registry: HistoryRegistry,
        config: Config,
        clock: Arc<dyn Clock>,
    ) -> CoreResult<Self> {
        for spec in registry.table_specs() {
            store.create_table(spec)?;
        }
        info!(
            entities = registry.len(),
            commit_mode = ?config.commit_mode,
            timestamps = ?config.timestamp_policy,
            "history context ready"
        );
        Ok(Self {
            store,
            registry,
            config,
            clock,
        })
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the registry.
    pub fn registry(&self) -> &HistoryRegistry {
        &self.registry
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a version query using the configured strategy.
    pub fn versions(&self) -> VersionQuery<'_, S> {
        VersionQuery::new(&self.store, self.config.version_strategy)
    }

    /// Begins a unit of work.
    pub fn begin(&self) -> CoreResult<UnitOfWork> {
        Ok(self.store.begin()?)
    }

    /// Stages an insert of `entity`.
    pub fn stage_insert<T: Entity>(&self, uow: &mut UnitOfWork, entity: &T) -> CoreResult<()> {
        self.registry.require::<T>()?;
        uow.insert(T::TABLE, entity.key().to_value(), entity.to_record())?;
        Ok(())
    }

    /// Stages an update of `entity`.
    pub fn stage_update<T: Entity>(&self, uow: &mut UnitOfWork, entity: &T) -> CoreResult<()> {
        self.registry.require::<T>()?;
        uow.update(T::TABLE, entity.key().to_value(), entity.to_record())?;
        Ok(())
    }

    /// Stages a delete of the entity with `key`.
    pub fn stage_delete<T: Entity>(&self, uow: &mut UnitOfWork, key: &T::Key) -> CoreResult<()> {
        self.registry.require::<T>()?;
        uow.delete(T::TABLE, key.to_value())?;
        Ok(())
    }

    /// Commits a unit of work and records history for it.
    pub fn save_changes(&self, uow: &mut UnitOfWork) -> CoreResult<SaveReport> {
        self.save_changes_with(uow, &CancellationToken::new())
    }

    /// Commits a unit of work and records history for it, honoring
    /// cancellation.
    ///
    /// Cancellation is checked at each store boundary up to the primary
    /// commit; a cancelled save writes nothing and aborts the unit of work.
    /// Once the primary commit has succeeded, history is always written and a
    /// late cancellation is only reported through
    /// [`SaveReport::cancelled_after_commit`].
    ///
    /// Any failure before the primary commit completes aborts the unit of
    /// work.
    ///
    /// # Errors
    ///
    /// - `Cancelled` if cancellation was requested before the primary commit
    /// - `ConcurrentModification` if a staged row changed underneath
    /// - `HistoryPersist` if the primary commit succeeded but the history
    ///   commit failed (two-phase mode only)
    pub fn save_changes_with(
        &self,
        uow: &mut UnitOfWork,
        cancel: &CancellationToken,
    ) -> CoreResult<SaveReport> {
        uow.ensure_active()?;
        self.check_cancelled(uow, cancel)?;

        let snapshots = match collect_snapshots(&self.store, uow) {
            Ok(snapshots) => snapshots,
            Err(e) => {
                self.discard(uow);
                return Err(e);
            }
        };
        let synthesizer = HistorySynthesizer::new(&self.registry, self.config.timestamp_policy);
        let batch = match synthesizer.synthesize_all(&snapshots, self.clock.now()) {
            Ok(batch) => batch,
            Err(e) => {
                self.discard(uow);
                return Err(e);
            }
        };
        self.check_cancelled(uow, cancel)?;

        let report = match self.config.commit_mode {
            CommitMode::Atomic => self.commit_atomic(uow, snapshots.len(), batch)?,
            CommitMode::TwoPhase => self.commit_two_phase(uow, snapshots.len(), batch, cancel)?,
        };
        debug!(
            sequence = %report.sequence,
            snapshots = report.snapshots,
            unchanged = report.unchanged,
            history = report.history_written(),
            "saved changes"
        );
        Ok(report)
    }

    fn check_cancelled(&self, uow: &mut UnitOfWork, cancel: &CancellationToken) -> CoreResult<()> {
        if cancel.is_cancelled() {
            debug!(uow = %uow.id(), "save cancelled before commit");
            self.discard(uow);
            return Err(CoreError::Cancelled);
        }
        Ok(())
    }

    fn discard(&self, uow: &mut UnitOfWork) {
        if let Err(e) = self.store.abort(uow) {
            debug!(uow = %uow.id(), error = %e, "abort after failed save");
        }
    }

    fn commit_atomic(
        &self,
        uow: &mut UnitOfWork,
        snapshots: usize,
        batch: HistoryBatch,
    ) -> CoreResult<SaveReport> {
        for row in &batch.rows {
            if let Err(e) = uow.append(row.table, row.record.clone()) {
                self.discard(uow);
                return Err(e.into());
            }
        }
        let receipt = match self.store.commit(uow) {
            Ok(receipt) => receipt,
            Err(e) => {
                self.discard(uow);
                return Err(CoreError::from_commit(e));
            }
        };

        let start = receipt.appended.len().saturating_sub(batch.rows.len());
        let history_ids: Vec<HistoryId> = receipt.appended[start..]
            .iter()
            .copied()
            .map(HistoryId::new)
            .collect();
        Ok(SaveReport {
            sequence: receipt.sequence,
            history_sequence: (!history_ids.is_empty()).then_some(receipt.sequence),
            snapshots,
            unchanged: batch.unchanged,
            history_ids,
            cancelled_after_commit: false,
        })
    }

    fn commit_two_phase(
        &self,
        uow: &mut UnitOfWork,
        snapshots: usize,
        batch: HistoryBatch,
        cancel: &CancellationToken,
    ) -> CoreResult<SaveReport> {
        let receipt = match self.store.commit(uow) {
            Ok(receipt) => receipt,
            Err(e) => {
                self.discard(uow);
                return Err(CoreError::from_commit(e));
            }
        };

        let cancelled_after_commit = cancel.is_cancelled();
        if cancelled_after_commit {
            warn!(
                sequence = %receipt.sequence,
                pending = batch.rows.len(),
                "cancellation requested after primary commit, writing history anyway"
            );
        }

        let (history_sequence, history_ids) = if batch.is_empty() {
            (None, Vec::new())
        } else {
            let (sequence, ids) = self.append_history(receipt.sequence, &batch)?;
            (Some(sequence), ids)
        };

        Ok(SaveReport {
            sequence: receipt.sequence,
            history_sequence,
            snapshots,
            unchanged: batch.unchanged,
            history_ids,
            cancelled_after_commit,
        })
    }

    fn append_history(
        &self,
        primary: CommitSequence,
        batch: &HistoryBatch,
    ) -> CoreResult<(CommitSequence, Vec<HistoryId>)> {
        let unwritten = batch.rows.len();
        let persist = |source: StoreError| {
            error!(
                primary = %primary,
                unwritten,
                error = %source,
                "history write failed after primary commit"
            );
            CoreError::HistoryPersist {
                sequence: primary,
                unwritten,
                source,
            }
        };

        let mut uow = self.store.begin().map_err(persist)?;
        for row in &batch.rows {
            uow.append(row.table, row.record.clone()).map_err(persist)?;
        }
        let receipt = self.store.commit(&mut uow).map_err(persist)?;
        Ok((
            receipt.sequence,
            receipt.appended.into_iter().map(HistoryId::new).collect(),
        ))
    }

    /// Inserts a new entity.
    pub fn insert<T: Entity>(&self, entity: &T) -> CoreResult<SaveReport> {
        let mut uow = self.begin()?;
        self.stage_insert(&mut uow, entity)?;
        self.save_changes(&mut uow)
    }

    /// Replaces an existing entity.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if no entity has the same key.
    pub fn update<T: Entity>(&self, entity: &T) -> CoreResult<SaveReport> {
        self.ensure_exists::<T>(&entity.key())?;
        let mut uow = self.begin()?;
        self.stage_update(&mut uow, entity)?;
        self.save_changes(&mut uow)
    }

    /// Deletes an entity.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if no entity has this key.
    pub fn delete<T: Entity>(&self, key: &T::Key) -> CoreResult<SaveReport> {
        self.ensure_exists::<T>(key)?;
        let mut uow = self.begin()?;
        self.stage_delete::<T>(&mut uow, key)?;
        self.save_changes(&mut uow)
    }

    fn ensure_exists<T: Entity>(&self, key: &T::Key) -> CoreResult<()> {
        if self.get::<T>(key)?.is_none() {
            return Err(CoreError::EntityNotFound {
                table: T::TABLE,
                key: key.to_value(),
            });
        }
        Ok(())
    }

    /// Reads a live entity.
    pub fn get<T: Entity>(&self, key: &T::Key) -> CoreResult<Option<T>> {
        self.registry.require::<T>()?;
        self.store
            .get(T::TABLE, &key.to_value())?
            .map(|record| {
                T::from_record(&record).map_err(|e| CoreError::invalid_record(T::TABLE, e))
            })
            .transpose()
    }

    /// Reads every live entity of a type, ordered by key.
    pub fn list<T: Entity>(&self) -> CoreResult<Vec<T>> {
        self.registry.require::<T>()?;
        self.store
            .scan(T::TABLE)?
            .iter()
            .map(|record| {
                T::from_record(record).map_err(|e| CoreError::invalid_record(T::TABLE, e))
            })
            .collect()
    }

    /// Every history row of a type, in insertion order.
    pub fn history<T: HasHistory>(&self) -> CoreResult<Vec<T::History>> {
        self.registry.require_history::<T>()?;
        self.versions().rows::<T::History>()
    }

    /// Every history row of one entity, in insertion order.
    pub fn history_of<T: HasHistory>(&self, key: &T::Key) -> CoreResult<Vec<T::History>> {
        self.registry.require_history::<T>()?;
        self.versions().rows_of::<T::History>(key)
    }

    /// Lists every version of one entity.
    pub fn list_versions<T: HasHistory>(
        &self,
        key: &T::Key,
    ) -> CoreResult<Vec<VersionedEntity<T::History>>> {
        self.registry.require_history::<T>()?;
        self.versions().list::<T::History>(key)
    }

    /// Finds one version of one entity.
    pub fn find_version<T: HasHistory>(&self, key: &T::Key, version: u32) -> CoreResult<T::History> {
        self.registry.require_history::<T>()?;
        self.versions().find::<T::History>(key, version)
    }

    /// Lists every version of every entity of a type, grouped by key.
    pub fn all_versions<T: HasHistory>(
        &self,
    ) -> CoreResult<BTreeMap<T::Key, Vec<VersionedEntity<T::History>>>> {
        self.registry.require_history::<T>()?;
        self.versions().all::<T::History>()
    }

    /// Restores an entity to a recorded version.
    ///
    /// The restore is saved like any other change, so it appends a new
    /// history row unless the live entity already matches the version.
    /// Deleted entities are recreated.
    ///
    /// # Errors
    ///
    /// Returns `VersionNotFound` if the version does not exist.
    pub fn restore<T: HasHistory>(&self, key: &T::Key, version: u32) -> CoreResult<RestoredEntity<T>> {
        let target = self.find_version::<T>(key, version)?;
        let live = self.get::<T>(key)?;
        let (entity, outcome) = plan_restore::<T>(&target, live);

        let mut uow = self.begin()?;
        match outcome {
            RestoreOutcome::Recreated => self.stage_insert(&mut uow, &entity)?,
            RestoreOutcome::Updated | RestoreOutcome::Unchanged => {
                self.stage_update(&mut uow, &entity)?;
            }
        }
        let report = self.save_changes(&mut uow)?;

        info!(
            entity = type_name::<T>(),
            key = ?key,
            version,
            %outcome,
            "restored entity"
        );
        Ok(RestoredEntity {
            entity,
            outcome,
            version,
            report,
        })
    }
}
