#![forbid(unsafe_code)]

//! State holder the view layer talks to.
//!
//! [`RuleController`] owns the [`History`], an id allocator and two
//! transient markers. Every mutating call runs a pure edit from
//! [`crate::edit`] against the current root and commits the result; a
//! rejected edit is logged at debug level and returned, and no slot
//! changes.
//!
//! # Transient markers
//!
//! The "just inserted" id and the drop-landing state are visible for exactly
//! one render. Arming a marker schedules a single-shot clear; the host calls
//! [`RuleController::flush_deferred`] once the next render has observed it.
//! Each arming bumps the marker's generation, and a pending clear only takes
//! effect if its generation is still current, so a marker re-armed before
//! the flush is cleared by the newest clear alone.

use std::sync::Arc;

use rulekit_core::geometry::Rect;

use crate::edit::{self, Anchor};
use crate::error::EditError;
use crate::history::History;
use crate::id::{DEFAULT_ID_PREFIX, NodeIdAllocator};
use crate::model::{Group, GroupOperator, Node, NodeId, Rule};

/// Landing state recorded after a successful drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropState {
    pub dropped_rule_id: NodeId,
    pub avatar_bounds: Option<Rect>,
}

// ---------------------------------------------------------------------------
// TransientMarker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TransientMarker<T> {
    value: Option<T>,
    generation: u64,
}

impl<T> Default for TransientMarker<T> {
    fn default() -> Self {
        Self {
            value: None,
            generation: 0,
        }
    }
}

impl<T> TransientMarker<T> {
    /// Set the value and return the generation a pending clear must match.
    fn arm(&mut self, value: T) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.value = Some(value);
        self.generation
    }

    fn clear_if_current(&mut self, generation: u64) -> bool {
        if self.generation != generation || self.value.is_none() {
            return false;
        }
        self.value = None;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    NewRule,
    Drop,
}

#[derive(Debug, Clone, Copy)]
struct DeferredClear {
    marker: MarkerKind,
    generation: u64,
}

// ---------------------------------------------------------------------------
// RuleController
// ---------------------------------------------------------------------------

/// Current tree, one step of undo/redo, and the transient view markers.
#[derive(Debug, Clone)]
pub struct RuleController {
    history: History,
    ids: NodeIdAllocator,
    new_rule: TransientMarker<NodeId>,
    drop_state: TransientMarker<DropState>,
    deferred: Vec<DeferredClear>,
}

impl RuleController {
    /// Start from `root`, allocating fresh ids under the default prefix.
    #[must_use]
    pub fn new(root: Group) -> Self {
        Self::from_root(Arc::new(root))
    }

    #[must_use]
    pub fn from_root(root: Arc<Group>) -> Self {
        let ids = NodeIdAllocator::from_tree(DEFAULT_ID_PREFIX, &root);
        Self {
            history: History::new(root),
            ids,
            new_rule: TransientMarker::default(),
            drop_state: TransientMarker::default(),
            deferred: Vec::new(),
        }
    }

    /// Allocate ids under `prefix` instead, skipping ids already in the tree.
    #[must_use]
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ids = NodeIdAllocator::from_tree(prefix, self.history.current());
        self
    }

    /// The current root.
    #[must_use]
    pub fn root(&self) -> &Arc<Group> {
        self.history.current()
    }

    /// Hand out a fresh id for a node the caller is about to insert.
    pub fn allocate_id(&mut self) -> NodeId {
        self.ids.allocate()
    }

    // -- edits --------------------------------------------------------------

    pub fn add_rule(&mut self, node: impl Into<Node>, to_group: &NodeId) -> Result<(), EditError> {
        let node = node.into();
        let result = edit::add_rule(self.root(), node, to_group);
        self.apply("add_rule", result)
    }

    /// [`add_rule`](Self::add_rule), then mark the inserted node as new for
    /// one render.
    pub fn add_new_rule(
        &mut self,
        node: impl Into<Node>,
        to_group: &NodeId,
    ) -> Result<(), EditError> {
        let node = node.into();
        let node_id = node.id().clone();
        self.add_rule(node, to_group)?;
        let generation = self.new_rule.arm(node_id);
        self.schedule_clear(MarkerKind::NewRule, generation);
        Ok(())
    }

    /// Insert a placeholder rule with a fresh id and mark it new.
    pub fn add_default_rule(&mut self, to_group: &NodeId) -> Result<NodeId, EditError> {
        let id = self.allocate_id();
        self.add_new_rule(Rule::placeholder(id.clone()), to_group)?;
        Ok(id)
    }

    /// Insert an AND group holding one placeholder rule and mark it new.
    pub fn add_default_group(&mut self, to_group: &NodeId) -> Result<NodeId, EditError> {
        let group_id = self.allocate_id();
        let rule_id = self.allocate_id();
        let group = Group::with_initial_rule(group_id.clone(), Rule::placeholder(rule_id));
        self.add_new_rule(group, to_group)?;
        Ok(group_id)
    }

    pub fn remove_rule(&mut self, node_id: &NodeId, from_group: &NodeId) -> Result<(), EditError> {
        let result = edit::remove_rule(self.root(), node_id, from_group);
        self.apply("remove_rule", result)
    }

    pub fn set_group_operator(
        &mut self,
        group_id: &NodeId,
        op: GroupOperator,
    ) -> Result<(), EditError> {
        let result = edit::set_group_operator(self.root(), group_id, op);
        self.apply("set_group_operator", result)
    }

    /// Move `node_id` from `from_group` into `to_group`, optionally next to
    /// an anchor sibling. A move that changes nothing records no history.
    pub fn move_rule(
        &mut self,
        node_id: &NodeId,
        from_group: &NodeId,
        to_group: &NodeId,
        anchor: Option<Anchor>,
    ) -> Result<(), EditError> {
        let result = edit::move_rule(self.root(), node_id, from_group, to_group, anchor);
        self.apply("move_rule", result)
    }

    fn apply(
        &mut self,
        op: &'static str,
        result: Result<Arc<Group>, EditError>,
    ) -> Result<(), EditError> {
        match result {
            Ok(root) => {
                if self.history.commit(root) {
                    tracing::debug!(op, nodes = self.root().node_count(), "edit committed");
                }
                Ok(())
            }
            Err(err) => {
                tracing::debug!(op, %err, "edit rejected");
                Err(err)
            }
        }
    }

    // -- history ------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.history.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // -- transient markers --------------------------------------------------

    /// Id of the node inserted by the last [`add_new_rule`](Self::add_new_rule),
    /// until the next flush.
    #[must_use]
    pub fn new_rule_id(&self) -> Option<&NodeId> {
        self.new_rule.value.as_ref()
    }

    #[must_use]
    pub fn drop_state(&self) -> Option<&DropState> {
        self.drop_state.value.as_ref()
    }

    /// Record where a dropped rule landed, until the next flush.
    pub fn record_drop(&mut self, dropped_rule_id: NodeId, avatar_bounds: Option<Rect>) {
        let generation = self.drop_state.arm(DropState {
            dropped_rule_id,
            avatar_bounds,
        });
        self.schedule_clear(MarkerKind::Drop, generation);
    }

    /// Run the pending single-shot clears. Call once after each render.
    ///
    /// Returns how many markers were actually cleared.
    pub fn flush_deferred(&mut self) -> usize {
        let mut cleared = 0;
        for pending in std::mem::take(&mut self.deferred) {
            let done = match pending.marker {
                MarkerKind::NewRule => self.new_rule.clear_if_current(pending.generation),
                MarkerKind::Drop => self.drop_state.clear_if_current(pending.generation),
            };
            if done {
                cleared += 1;
            }
        }
        cleared
    }

    /// Returns true while a deferred clear is waiting for a flush.
    #[must_use]
    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    fn schedule_clear(&mut self, marker: MarkerKind, generation: u64) {
        self.deferred.push(DeferredClear { marker, generation });
    }
}
