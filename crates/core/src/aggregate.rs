//! Versioned documents and optimistic concurrency.

/// A document whose writes are serialized through a store-assigned version.
///
/// Stores bump the version on every successful write; callers hand the version they
/// read back as an [`ExpectedVersion`] so that lost updates surface as conflicts.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Version of the persisted state this value was read from (0 = never persisted).
    fn version(&self) -> u64;

    /// Expectation to send along with a write of this value.
    fn expected_version(&self) -> ExpectedVersion {
        ExpectedVersion::Exact(self.version())
    }
}

/// Optimistic concurrency expectation for a write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (initial inserts, administrative overwrites).
    Any,
    /// Require the stored document to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}
