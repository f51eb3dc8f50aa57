//! Core type definitions for the store.

use std::fmt;

/// Unique identifier for a unit of work.
///
/// Unit of work IDs are monotonically increasing and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitOfWorkId(pub u64);

impl UnitOfWorkId {
    /// Creates a new unit of work ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UnitOfWorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uow:{}", self.0)
    }
}

/// Sequence number for ordering commits.
///
/// Sequence numbers provide total ordering of committed units of work.
/// Higher sequence numbers indicate later commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommitSequence(pub u64);

impl CommitSequence {
    /// Creates a new sequence number.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Returns the raw sequence value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommitSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        assert!(CommitSequence::new(1) < CommitSequence::new(2));
        assert!(UnitOfWorkId::new(3) > UnitOfWorkId::new(2));
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", CommitSequence::new(42)), "seq:42");
        assert_eq!(format!("{}", UnitOfWorkId::new(7)), "uow:7");
    }
}
