//! Join tables: materialized satisfying combinations for one join point.
//!
//! Rows are stored in an `im::OrdMap` so that a cross-join can iterate a
//! cheap snapshot of one table while inserting into others, and so the
//! retraction walk can remove rows while iterating a snapshot taken from
//! the reverse index.

use std::collections::HashMap;
use std::sync::Arc;

use im::OrdMap;

use crate::ids::{HandleId, IdGen, RowId};

/// One row of a join table: a fixed-size ordered list of handles, one per
/// joined tuple type, that jointly satisfy the join point's conditions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinTableRow {
    id: RowId,
    handles: Vec<HandleId>,
}

impl JoinTableRow {
    /// Row id, issued by the network id generator.
    #[must_use]
    pub const fn id(&self) -> RowId {
        self.id
    }

    /// Participating handles in join order.
    #[must_use]
    pub fn handles(&self) -> &[HandleId] {
        &self.handles
    }
}

/// Row storage for one join point of one rule.
///
/// Invariant: a row exists if and only if its constituent handles are all
/// live and jointly satisfied the join point's conditions when inserted;
/// retraction removes every row a retracted handle participates in.
#[derive(Clone, Debug)]
pub struct JoinTable {
    id: u64,
    name: Arc<str>,
    rule_name: Arc<str>,
    identifiers: Vec<Arc<str>>,
    rows: OrdMap<RowId, JoinTableRow>,
}

impl JoinTable {
    /// Table id, issued by the network id generator.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Table name, unique within the network.
    #[must_use]
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// Name of the rule this table belongs to.
    #[must_use]
    pub fn rule_name(&self) -> &Arc<str> {
        &self.rule_name
    }

    /// Tuple types joined by this table, in join order.
    #[must_use]
    pub fn identifiers(&self) -> &[Arc<str>] {
        &self.identifiers
    }

    /// Inserts a row under the given id.
    pub fn add_row(&mut self, id: RowId, handles: Vec<HandleId>) {
        self.rows.insert(id, JoinTableRow { id, handles });
    }

    /// Removes a row by id, returning it.
    pub fn remove_row(&mut self, id: RowId) -> Option<JoinTableRow> {
        self.rows.remove(&id)
    }

    /// Looks up a row by id.
    #[must_use]
    pub fn row(&self, id: RowId) -> Option<&JoinTableRow> {
        self.rows.get(&id)
    }

    /// Returns an O(1) snapshot of the current rows, safe to iterate while
    /// the table is mutated.
    #[must_use]
    pub fn rows_snapshot(&self) -> OrdMap<RowId, JoinTableRow> {
        self.rows.clone()
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Removes every row, returning them. Used when the owning rule is
    /// deleted.
    pub fn remove_all_rows(&mut self) -> Vec<JoinTableRow> {
        let drained = std::mem::take(&mut self.rows);
        drained.into_iter().map(|(_, row)| row).collect()
    }
}

/// Owns every join table of one network, keyed by table name.
#[derive(Debug, Default)]
pub struct JtService {
    tables: HashMap<Arc<str>, JoinTable>,
}

impl JtService {
    /// Creates an empty join-table service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table with this name, creating it if absent.
    /// Idempotent per name.
    pub fn get_or_create(
        &mut self,
        id_gen: &mut IdGen,
        rule_name: Arc<str>,
        identifiers: Vec<Arc<str>>,
        name: Arc<str>,
    ) -> &mut JoinTable {
        self.tables.entry(name.clone()).or_insert_with(|| JoinTable {
            id: id_gen.next_id(),
            name,
            rule_name,
            identifiers,
            rows: OrdMap::new(),
        })
    }

    /// Looks up a table by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&JoinTable> {
        self.tables.get(name)
    }

    /// Looks up a table mutably by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut JoinTable> {
        self.tables.get_mut(name)
    }

    /// Removes a table entirely, returning it. Used for rule deletion.
    pub fn remove(&mut self, name: &str) -> Option<JoinTable> {
        self.tables.remove(name)
    }

    /// Number of tables.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Total rows across all tables.
    #[must_use]
    pub fn total_row_count(&self) -> usize {
        self.tables.values().map(JoinTable::row_count).sum()
    }

    /// Drops all tables.
    pub fn clear(&mut self) {
        self.tables.clear();
    }
}
