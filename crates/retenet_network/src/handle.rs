//! The tuple handle lifecycle.
//!
//! A [`ReteHandle`] is the network's internal proxy for one asserted tuple.
//! Join tables reference handles by id, never tuples directly; at most one
//! live handle exists per tuple key within a network.

use std::collections::HashMap;
use std::sync::Arc;

use retenet_foundation::{Error, Result};
use retenet_model::{Tuple, TupleKey};

use crate::ids::{HandleId, IdGen};

/// Lifecycle status of a handle.
///
/// Transitions: `Unknown` → `Creating` (on class-node assert) → `Created`
/// (once propagation completes) → `Deleting` (on retract) → removed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HandleStatus {
    /// No handle exists for the key.
    #[default]
    Unknown,
    /// Allocated; propagation through the network is in progress.
    Creating,
    /// Fully propagated and eligible to participate in joins.
    Created,
    /// Retraction in progress; must not be returned by `get_or_create`.
    Deleting,
}

/// Wraps exactly one tuple by reference and carries its network identity
/// and lifecycle status.
#[derive(Clone, Debug)]
pub struct ReteHandle {
    id: HandleId,
    key: TupleKey,
    tuple: Arc<Tuple>,
    status: HandleStatus,
}

impl ReteHandle {
    /// Network-scoped handle id.
    #[must_use]
    pub const fn id(&self) -> HandleId {
        self.id
    }

    /// The key of the wrapped tuple.
    #[must_use]
    pub fn key(&self) -> &TupleKey {
        &self.key
    }

    /// The wrapped tuple.
    #[must_use]
    pub fn tuple(&self) -> &Arc<Tuple> {
        &self.tuple
    }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> HandleStatus {
        self.status
    }
}

/// Owns every handle of one network: an arena keyed by handle id with a
/// tuple-key index.
#[derive(Debug, Default)]
pub struct HandleService {
    by_id: HashMap<HandleId, ReteHandle>,
    by_key: HashMap<TupleKey, HandleId>,
}

impl HandleService {
    /// Creates an empty handle service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing handle id for the tuple's key, or allocates a
    /// new handle in `Creating` status. The boolean is true if a handle was
    /// created.
    ///
    /// # Errors
    /// Returns an internal error if the existing handle is mid-retraction;
    /// the session lock makes that state unreachable from callers.
    pub fn get_or_create(
        &mut self,
        id_gen: &mut IdGen,
        tuple: &Arc<Tuple>,
    ) -> Result<(HandleId, bool)> {
        if let Some(&id) = self.by_key.get(tuple.key()) {
            let handle = self
                .by_id
                .get(&id)
                .ok_or_else(|| Error::internal(format!("handle index desync for {}", tuple.key())))?;
            if handle.status == HandleStatus::Deleting {
                return Err(Error::internal(format!(
                    "handle for {} targeted while deleting",
                    tuple.key()
                )));
            }
            return Ok((id, false));
        }

        let id = HandleId::new(id_gen.next_id());
        let handle = ReteHandle {
            id,
            key: tuple.key().clone(),
            tuple: tuple.clone(),
            status: HandleStatus::Creating,
        };
        self.by_key.insert(handle.key.clone(), id);
        self.by_id.insert(id, handle);
        Ok((id, true))
    }

    /// Looks up a handle by id.
    #[must_use]
    pub fn get(&self, id: HandleId) -> Option<&ReteHandle> {
        self.by_id.get(&id)
    }

    /// Looks up a handle by tuple key.
    #[must_use]
    pub fn get_by_key(&self, key: &TupleKey) -> Option<&ReteHandle> {
        self.by_key.get(key).and_then(|id| self.by_id.get(id))
    }

    /// Status of the handle with this id, `Unknown` if none exists.
    #[must_use]
    pub fn status_of(&self, id: HandleId) -> HandleStatus {
        self.by_id
            .get(&id)
            .map_or(HandleStatus::Unknown, |h| h.status)
    }

    /// Transitions a handle's status.
    ///
    /// # Errors
    /// Returns an internal error if no handle with this id exists.
    pub fn set_status(&mut self, id: HandleId, status: HandleStatus) -> Result<()> {
        let handle = self
            .by_id
            .get_mut(&id)
            .ok_or_else(|| Error::internal(format!("no handle {id:?} to transition")))?;
        handle.status = status;
        Ok(())
    }

    /// Removes the handle for this key, returning it.
    ///
    /// Callers must clear all join-table references first; the retraction
    /// walk enforces this.
    pub fn remove(&mut self, key: &TupleKey) -> Option<ReteHandle> {
        let id = self.by_key.remove(key)?;
        self.by_id.remove(&id)
    }

    /// Returns true if a live handle exists for this key.
    #[must_use]
    pub fn contains_key(&self, key: &TupleKey) -> bool {
        self.by_key.contains_key(key)
    }

    /// Number of live handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true if no handles are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Drops all handles.
    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_key.clear();
    }
}
