//! The network: class nodes, rule networks, and propagation.
//!
//! Assert flow: the tuple's class node resolves a handle, every linked
//! rule network filters and cross-joins the new handle against the rows
//! already stored on the counterpart side of each join stage, and each row
//! reaching a rule's terminal table becomes one [`Activation`]. Retract
//! flow runs the reverse-index walk: every row the handle participates in,
//! in every table of every rule, is removed before the handle itself.

use std::collections::HashMap;
use std::sync::Arc;

use retenet_foundation::{Error, ErrorKind, Result};
use retenet_model::{Rule, Tuple, TupleKey, TupleMap, TypeRegistry};

use crate::handle::{HandleService, HandleStatus};
use crate::ids::{HandleId, IdGen, RowId};
use crate::jointable::JtService;
use crate::jtrefs::JtRefs;
use crate::node::{ClassNode, RuleNetwork};

/// One completed match, ready to fire.
///
/// Produced during assert propagation; the session layer sorts activations
/// by priority and registration order before invoking actions.
#[derive(Clone, Debug)]
pub struct Activation {
    /// The rule whose conditions were all satisfied.
    pub rule_name: Arc<str>,
    /// The rule's firing priority (higher fires first).
    pub priority: i32,
    /// The rule's registration sequence (tie-break).
    pub seq: u64,
    /// The matched tuples, keyed by tuple type.
    pub tuples: TupleMap,
}

/// Mutable propagation state: id generation, handles, tables, and the
/// reverse index. Split from the rule networks so propagation can borrow
/// a rule network immutably while mutating state.
#[derive(Debug, Default)]
struct NetworkState {
    id_gen: IdGen,
    handles: HandleService,
    tables: JtService,
    refs: JtRefs,
}

/// The node network of one rule session.
#[derive(Default)]
pub struct Network {
    state: NetworkState,
    class_nodes: HashMap<Arc<str>, ClassNode>,
    rules: HashMap<Arc<str>, Arc<RuleNetwork>>,
    next_seq: u64,
}

impl Network {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles and wires a rule into the network.
    ///
    /// Creates the rule's join tables and links the class node of every
    /// tuple type the rule references; class nodes are shared across
    /// rules. A rule only matches tuples asserted after it was added.
    ///
    /// # Errors
    /// Fails for a duplicate rule name, a condition referencing an
    /// unregistered tuple type, or a structurally invalid rule.
    pub fn add_rule(&mut self, registry: &TypeRegistry, rule: Rule) -> Result<()> {
        let name = rule.name().clone();
        if self.rules.contains_key(&name) {
            return Err(ErrorKind::DuplicateRule(name.to_string()).into());
        }
        for ident in rule.identifiers() {
            if !registry.contains(&ident) {
                return Err(Error::unknown_tuple_type(ident.to_string())
                    .with_context(format!("rule {name}")));
            }
        }

        let seq = self.next_seq;
        let rn = RuleNetwork::compile(rule, seq)?;
        self.next_seq += 1;

        for chain in &rn.chains {
            self.state.tables.get_or_create(
                &mut self.state.id_gen,
                name.clone(),
                vec![chain.identifier.clone()],
                chain.alpha.clone(),
            );
        }
        for (i, stage) in rn.stages.iter().enumerate() {
            self.state.tables.get_or_create(
                &mut self.state.id_gen,
                name.clone(),
                rn.identifiers[..=i + 1].to_vec(),
                stage.out.clone(),
            );
        }

        for ident in &rn.identifiers {
            self.class_nodes
                .entry(ident.clone())
                .or_insert_with(|| ClassNode::new(ident.clone()))
                .add_link(name.clone());
        }

        self.rules.insert(name, Arc::new(rn));
        Ok(())
    }

    /// Tears down a rule: its join tables (clearing reverse-index entries
    /// for their rows), its class-node links, and its compiled network.
    /// Class nodes still referenced by other rules persist.
    ///
    /// # Errors
    /// Fails if no rule with this name is registered.
    pub fn delete_rule(&mut self, name: &str) -> Result<()> {
        let rn = self
            .rules
            .remove(name)
            .ok_or_else(|| Error::new(ErrorKind::NoSuchRule(name.to_string())))?;

        for table_name in rn.table_names() {
            if let Some(mut table) = self.state.tables.remove(&table_name) {
                for row in table.remove_all_rows() {
                    for &h in row.handles() {
                        self.state.refs.remove_entry(h, &table_name, row.id());
                    }
                }
            }
        }

        for ident in &rn.identifiers {
            if let Some(class_node) = self.class_nodes.get_mut(ident) {
                class_node.remove_link(name);
                if class_node.links().is_empty() {
                    self.class_nodes.remove(ident);
                }
            }
        }
        Ok(())
    }

    /// Asserts a tuple: resolves its handle and propagates it through
    /// every rule network linked to its class node, returning the
    /// activations completed by this assert in creation order.
    ///
    /// # Errors
    /// A tuple whose key already has a live handle is rejected as a
    /// duplicate assert.
    pub fn assert(&mut self, tuple: &Arc<Tuple>) -> Result<Vec<Activation>> {
        if self.state.handles.contains_key(tuple.key()) {
            return Err(Error::duplicate_assert(tuple.key().to_string()));
        }
        let (hid, _) = self
            .state
            .handles
            .get_or_create(&mut self.state.id_gen, tuple)?;

        let mut activations = Vec::new();
        let links: Vec<Arc<str>> = self
            .class_nodes
            .get(tuple.tuple_type().as_ref())
            .map(|cn| cn.links().to_vec())
            .unwrap_or_default();
        for rule_name in links {
            let rn = self
                .rules
                .get(&rule_name)
                .cloned()
                .ok_or_else(|| Error::internal(format!("dangling class link to {rule_name}")))?;
            self.state.propagate_assert(&rn, hid, &mut activations)?;
        }

        self.state.handles.set_status(hid, HandleStatus::Created)?;
        Ok(activations)
    }

    /// Retracts the tuple with this key: removes every join-table row the
    /// handle participates in (across all rules), then the handle itself.
    /// No activations result; actions fire on completion only.
    ///
    /// # Errors
    /// Fails if no live handle exists for the key, or if the reverse index
    /// is left non-empty after the walk (an engine invariant violation).
    pub fn retract(&mut self, key: &TupleKey) -> Result<()> {
        let hid = self
            .state
            .handles
            .get_by_key(key)
            .map(crate::handle::ReteHandle::id)
            .ok_or_else(|| Error::handle_not_found(key.to_string()))?;
        self.state.handles.set_status(hid, HandleStatus::Deleting)?;

        let snapshot = self.state.refs.snapshot(hid);
        for (table_name, rows) in &snapshot {
            for &row_id in rows {
                self.state.remove_row(table_name, row_id);
            }
        }

        if self.state.refs.has_refs(hid) {
            return Err(Error::internal(format!(
                "reference index not drained for {key}"
            )));
        }
        self.state.refs.remove_handle(hid);
        self.state.handles.remove(key);
        Ok(())
    }

    /// The compiled network for a rule, if registered.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&Arc<RuleNetwork>> {
        self.rules.get(name)
    }

    /// Registered rule names in registration order.
    #[must_use]
    pub fn rule_names(&self) -> Vec<Arc<str>> {
        let mut names: Vec<&Arc<RuleNetwork>> = self.rules.values().collect();
        names.sort_by_key(|rn| rn.seq());
        names.iter().map(|rn| rn.rule().name().clone()).collect()
    }

    /// Returns true if a live handle exists for this key.
    #[must_use]
    pub fn contains_fact(&self, key: &TupleKey) -> bool {
        self.state.handles.contains_key(key)
    }

    /// Number of live handles.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        self.state.handles.len()
    }

    /// Total rows across every join table in the network.
    #[must_use]
    pub fn total_row_count(&self) -> usize {
        self.state.tables.total_row_count()
    }

    /// Total rows across the join tables owned by one rule.
    ///
    /// # Errors
    /// Fails if no rule with this name is registered.
    pub fn rule_row_count(&self, name: &str) -> Result<usize> {
        let rn = self
            .rules
            .get(name)
            .ok_or_else(|| Error::new(ErrorKind::NoSuchRule(name.to_string())))?;
        Ok(rn
            .table_names()
            .iter()
            .filter_map(|t| self.state.tables.get(t))
            .map(crate::jointable::JoinTable::row_count)
            .sum())
    }

    /// Releases all network state: handles, tables, references, nodes,
    /// and rules.
    pub fn clear(&mut self) {
        self.state = NetworkState::default();
        self.class_nodes.clear();
        self.rules.clear();
        self.next_seq = 0;
    }
}

impl NetworkState {
    /// Runs one handle through a rule network: filter gates, alpha
    /// insertion, then the join cascade.
    fn propagate_assert(
        &mut self,
        rn: &RuleNetwork,
        hid: HandleId,
        activations: &mut Vec<Activation>,
    ) -> Result<()> {
        let handle = self
            .handles
            .get(hid)
            .ok_or_else(|| Error::internal(format!("propagating unknown handle {hid:?}")))?;
        let tuple = handle.tuple().clone();
        let type_name = tuple.tuple_type().clone();

        let chain_idx = rn
            .identifiers
            .iter()
            .position(|i| i == &type_name)
            .ok_or_else(|| {
                Error::internal(format!(
                    "class link routed {type_name} to rule {} which does not join it",
                    rn.rule().name()
                ))
            })?;
        let chain = &rn.chains[chain_idx];

        let mut tuples = TupleMap::new();
        tuples.insert(type_name, tuple);
        for &ci in &chain.filters {
            let cond = &rn.rule().conditions()[ci];
            if !cond.evaluate(rn.rule().name(), &tuples, rn.rule().context()) {
                // Assert suppressed; a retract needs no filter pass since
                // the reverse index already knows the handle has no rows.
                return Ok(());
            }
        }

        let seed = vec![hid];
        self.insert_row(&chain.alpha, &seed)?;
        if chain.alpha == *rn.terminal() {
            activations.push(Self::activation(rn, tuples));
            return Ok(());
        }

        if chain_idx == 0 {
            self.cross(rn, 0, &seed, true, activations)
        } else {
            self.cross(rn, chain_idx - 1, &seed, false, activations)
        }
    }

    /// Cross-joins a newly stored row (left combination or right single)
    /// against the counterpart table of one stage, cascading satisfying
    /// combinations downstream.
    fn cross(
        &mut self,
        rn: &RuleNetwork,
        stage_idx: usize,
        new_handles: &[HandleId],
        from_left: bool,
        activations: &mut Vec<Activation>,
    ) -> Result<()> {
        let stage = &rn.stages[stage_idx];
        let counterpart = if from_left { &stage.right } else { &stage.left };
        let rows = self
            .tables
            .get(counterpart)
            .ok_or_else(|| Error::internal(format!("missing join table {counterpart}")))?
            .rows_snapshot();

        'rows: for (_, row) in &rows {
            // Only fully propagated handles participate in joins.
            if row
                .handles()
                .iter()
                .any(|&h| self.handles.status_of(h) != HandleStatus::Created)
            {
                continue;
            }

            let mut combined = Vec::with_capacity(new_handles.len() + row.handles().len());
            if from_left {
                combined.extend_from_slice(new_handles);
                combined.extend_from_slice(row.handles());
            } else {
                combined.extend_from_slice(row.handles());
                combined.extend_from_slice(new_handles);
            }

            let tuples = self.tuple_map(rn, &combined)?;
            for &ci in &stage.conditions {
                let cond = &rn.rule().conditions()[ci];
                if !cond.evaluate(rn.rule().name(), &tuples, rn.rule().context()) {
                    continue 'rows;
                }
            }

            self.insert_row(&stage.out, &combined)?;
            if stage.out == *rn.terminal() {
                activations.push(Self::activation(rn, tuples));
            } else {
                self.cross(rn, stage_idx + 1, &combined, true, activations)?;
            }
        }
        Ok(())
    }

    /// Inserts a row and registers it in the reverse index for every
    /// participating handle.
    fn insert_row(&mut self, table: &Arc<str>, handles: &[HandleId]) -> Result<RowId> {
        let row_id = RowId::new(self.id_gen.next_id());
        let t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| Error::internal(format!("missing join table {table}")))?;
        t.add_row(row_id, handles.to_vec());
        for &h in handles {
            self.refs.add_entry(h, table, row_id);
        }
        Ok(row_id)
    }

    /// Removes a row and its reverse-index entries for every participant.
    fn remove_row(&mut self, table: &Arc<str>, row_id: RowId) {
        if let Some(row) = self.tables.get_mut(table).and_then(|t| t.remove_row(row_id)) {
            for &h in row.handles() {
                self.refs.remove_entry(h, table, row_id);
            }
        }
    }

    /// Builds the tuples-by-type map for a handle combination, which is
    /// aligned with the rule's identifier prefix.
    fn tuple_map(&self, rn: &RuleNetwork, handles: &[HandleId]) -> Result<TupleMap> {
        let mut map = TupleMap::new();
        for (i, &h) in handles.iter().enumerate() {
            let handle = self
                .handles
                .get(h)
                .ok_or_else(|| Error::internal(format!("row references unknown handle {h:?}")))?;
            map.insert(rn.identifiers[i].clone(), handle.tuple().clone());
        }
        Ok(map)
    }

    fn activation(rn: &RuleNetwork, tuples: TupleMap) -> Activation {
        Activation {
            rule_name: rn.rule().name().clone(),
            priority: rn.rule().priority(),
            seq: rn.seq(),
            tuples,
        }
    }
}
