//! Network-scoped identifier generation.

use std::fmt;

/// Issues unique, monotonically increasing identifiers scoped to one
/// network instance.
///
/// Identifiers are never reused after removal, so a stale reference can
/// never alias a live handle or row.
#[derive(Clone, Debug, Default)]
pub struct IdGen {
    next: u64,
}

impl IdGen {
    /// Creates a generator whose first issued id is 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh id, unique for the lifetime of this network.
    pub fn next_id(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    /// Returns the highest id issued so far (0 if none).
    #[must_use]
    pub const fn max_id(&self) -> u64 {
        self.next
    }
}

/// Identifier of a [`crate::ReteHandle`] within its network.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    /// Wraps a generated id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandleId({})", self.0)
    }
}

/// Identifier of a [`crate::JoinTableRow`] within its network.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(u64);

impl RowId {
    /// Wraps a generated id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowId({})", self.0)
    }
}
