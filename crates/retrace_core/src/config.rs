//! Engine configuration.

/// How history rows are committed relative to the primary change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    /// Commit the primary change, then append history in a second commit.
    ///
    /// If the second commit fails, the primary change stays and the save
    /// reports [`crate::CoreError::HistoryPersist`].
    #[default]
    TwoPhase,
    /// Append history to the same unit of work and commit once.
    Atomic,
}

/// Which transitions receive a `created_at` stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampPolicy {
    /// Stamp creates, updates and deletes.
    #[default]
    EveryTransition,
    /// Stamp creates only; other rows keep a null `created_at`.
    ///
    /// Null sorts first, so unstamped rows are numbered before the create
    /// that precedes them.
    CreateOnly,
}

/// How version queries are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionStrategy {
    /// Filter, order and paginate inside the store.
    #[default]
    Pushdown,
    /// Load every history row, group by parent, then number.
    Eager,
}

/// Configuration for a history context.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Commit mode for saves.
    pub commit_mode: CommitMode,

    /// Timestamp policy for synthesized history.
    pub timestamp_policy: TimestampPolicy,

    /// Execution strategy for version queries.
    pub version_strategy: VersionStrategy,
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the commit mode.
    #[must_use]
    pub const fn commit_mode(mut self, mode: CommitMode) -> Self {
        self.commit_mode = mode;
        self
    }

    /// Sets the timestamp policy.
    #[must_use]
    pub const fn timestamp_policy(mut self, policy: TimestampPolicy) -> Self {
        self.timestamp_policy = policy;
        self
    }

    /// Sets the version query strategy.
    #[must_use]
    pub const fn version_strategy(mut self, strategy: VersionStrategy) -> Self {
        self.version_strategy = strategy;
        self
    }
}
