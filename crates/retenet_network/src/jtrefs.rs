//! Reverse index from handles to the join-table rows they participate in.
//!
//! This index is what makes retraction incremental: every row a handle
//! touches, in every table of every rule, is listed here, so a retract
//! never rescans join tables. Invariant: by the time a handle is removed
//! from the handle service, its entry here must be empty.

use std::collections::HashMap;
use std::sync::Arc;

use im::{OrdMap, OrdSet};

use crate::ids::{HandleId, RowId};

/// The handle → (table name, row id) reverse index.
#[derive(Debug, Default)]
pub struct JtRefs {
    refs: HashMap<HandleId, OrdMap<Arc<str>, OrdSet<RowId>>>,
}

impl JtRefs {
    /// Creates an empty reference index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `handle` participates in row `row` of table `table`.
    pub fn add_entry(&mut self, handle: HandleId, table: &Arc<str>, row: RowId) {
        self.refs
            .entry(handle)
            .or_default()
            .entry(table.clone())
            .or_insert_with(OrdSet::new)
            .insert(row);
    }

    /// Removes one (table, row) entry for `handle`. Empty per-table sets
    /// and empty per-handle maps are pruned.
    pub fn remove_entry(&mut self, handle: HandleId, table: &str, row: RowId) {
        let Some(by_table) = self.refs.get_mut(&handle) else {
            return;
        };
        let mut drained = false;
        if let Some(rows) = by_table.get_mut(table) {
            rows.remove(&row);
            drained = rows.is_empty();
        }
        if drained {
            by_table.remove(table);
        }
        if by_table.is_empty() {
            self.refs.remove(&handle);
        }
    }

    /// Returns an O(1) snapshot of every (table, rows) entry for `handle`,
    /// safe to iterate while entries are removed. Empty if the handle has
    /// no references.
    #[must_use]
    pub fn snapshot(&self, handle: HandleId) -> OrdMap<Arc<str>, OrdSet<RowId>> {
        self.refs.get(&handle).cloned().unwrap_or_default()
    }

    /// Returns true if any row still references `handle`.
    #[must_use]
    pub fn has_refs(&self, handle: HandleId) -> bool {
        self.refs.get(&handle).is_some_and(|m| !m.is_empty())
    }

    /// Drops the (expected-empty) entry for a handle being removed.
    pub fn remove_handle(&mut self, handle: HandleId) {
        self.refs.remove(&handle);
    }

    /// Number of handles with at least one reference.
    #[must_use]
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    /// Returns true if no handle has references.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Drops all entries.
    pub fn clear(&mut self) {
        self.refs.clear();
    }
}
