#![forbid(unsafe_code)]

//! Drop regions for rule trees.
//!
//! [`DropRegionResolver`] is the [`DragListener`] that turns pointer
//! positions into tree moves. At session start it asks its [`ViewAdapter`]
//! for the on-screen rectangle of every leaf rule and splits each one into
//! two regions: the top half drops *before* that rule, the bottom half
//! *after* it. Hovering picks the first region containing the pointer and
//! moves the placeholder there; releasing over a region asks the
//! [`RuleController`] to move the dragged rule.
//!
//! Everything here is expressed in ids and rectangles; how rows are laid out
//! and drawn is the adapter's business.
//!
//! # Invariants
//!
//! 1. Regions are hit-tested in construction order, bounds inclusive; the
//!    first hit wins.
//! 2. A pointer outside every region keeps the previously active region.
//! 3. After `on_session_end` the dragged node is visible again, the
//!    placeholder is gone and no region is kept.

use std::cell::RefCell;
use std::rc::Rc;

use rulekit_core::geometry::{Position, Rect};
use rulekit_tree::{Anchor, Group, NodeId, Relation, RuleController};

use crate::drag::{DragListener, DragListenerError, DragPayload, DropRequest, SessionOutcome};

/// Payload kind for dragging a rule or group within a tree.
pub const RULE_DRAG_KIND: &str = "rulekit/rule";

/// What a rule drag carries: the dragged node and the group it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDragData {
    pub rule_id: NodeId,
    pub parent_group_id: NodeId,
}

impl RuleDragData {
    /// Describe dragging `rule_id` out of `root`. `None` if it is not in the
    /// tree (the root itself cannot be dragged).
    #[must_use]
    pub fn locate(root: &Group, rule_id: &NodeId) -> Option<Self> {
        let parent = root.parent_of(rule_id)?;
        Some(Self {
            rule_id: rule_id.clone(),
            parent_group_id: parent.id().clone(),
        })
    }

    /// Wrap into a payload of kind [`RULE_DRAG_KIND`].
    #[must_use]
    pub fn into_payload(self) -> DragPayload {
        let text = self.rule_id.to_string();
        DragPayload::new(RULE_DRAG_KIND, self).with_display_text(text)
    }
}

/// On-screen rectangle of one leaf rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafPosition {
    pub id: NodeId,
    pub containing_group_id: NodeId,
    pub bounds: Rect,
}

/// A hit-testable rectangle mapped to an insertion point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropRegion {
    pub bounds: Rect,
    pub target_group_id: NodeId,
    pub anchor_id: NodeId,
    pub relation: Relation,
}

impl DropRegion {
    #[must_use]
    pub fn anchor(&self) -> Anchor {
        Anchor {
            id: self.anchor_id.clone(),
            relation: self.relation,
        }
    }
}

/// The view-side capabilities the resolver needs.
pub trait ViewAdapter {
    /// Bounds of every leaf rule currently laid out for `root`.
    fn list_leaf_positions(&self, root: &Group) -> Vec<LeafPosition>;

    /// Show the drop placeholder next to `anchor_id`.
    fn place_placeholder(&mut self, anchor_id: &NodeId, relation: Relation);

    fn remove_placeholder(&mut self);

    fn set_node_hidden(&mut self, id: &NodeId, hidden: bool);
}

/// Two regions per leaf, top half `Before` then bottom half `After`, in
/// leaf order.
#[must_use]
pub fn compute_regions(leaves: &[LeafPosition]) -> Vec<DropRegion> {
    let mut regions = Vec::with_capacity(leaves.len() * 2);
    for leaf in leaves {
        let (top, bottom) = leaf.bounds.split_vertical_halves();
        for (bounds, relation) in [(top, Relation::Before), (bottom, Relation::After)] {
            regions.push(DropRegion {
                bounds,
                target_group_id: leaf.containing_group_id.clone(),
                anchor_id: leaf.id.clone(),
                relation,
            });
        }
    }
    regions
}

/// Index of the first region whose bounds (inclusive) contain `pointer`.
#[must_use]
pub fn hit_test(regions: &[DropRegion], pointer: Position) -> Option<usize> {
    regions
        .iter()
        .position(|region| region.bounds.contains_inclusive(pointer))
}

// ---------------------------------------------------------------------------
// DropRegionResolver
// ---------------------------------------------------------------------------

/// Drag listener that moves rules within one controller's tree.
#[derive(Debug)]
pub struct DropRegionResolver<A: ViewAdapter> {
    controller: Rc<RefCell<RuleController>>,
    adapter: A,
    dragged: Option<RuleDragData>,
    regions: Vec<DropRegion>,
    active: Option<usize>,
}

impl<A: ViewAdapter> DropRegionResolver<A> {
    #[must_use]
    pub fn new(controller: Rc<RefCell<RuleController>>, adapter: A) -> Self {
        Self {
            controller,
            adapter,
            dragged: None,
            regions: Vec::new(),
            active: None,
        }
    }

    #[must_use]
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// Regions computed for the running session.
    #[must_use]
    pub fn regions(&self) -> &[DropRegion] {
        &self.regions
    }

    #[must_use]
    pub fn active_region(&self) -> Option<&DropRegion> {
        self.regions.get(self.active?)
    }

    #[must_use]
    pub fn dragged(&self) -> Option<&RuleDragData> {
        self.dragged.as_ref()
    }
}

impl<A: ViewAdapter> DragListener for DropRegionResolver<A> {
    fn on_session_start(&mut self, payload: &DragPayload) -> bool {
        if !payload.matches_kind(RULE_DRAG_KIND) {
            return false;
        }
        let Some(data) = payload.downcast_ref::<RuleDragData>() else {
            tracing::debug!(kind = %payload.kind, "rule drag without rule data; ignored");
            return false;
        };
        let Ok(controller) = self.controller.try_borrow() else {
            tracing::warn!(rule = %data.rule_id, "rule controller busy at drag start; ignored");
            return false;
        };
        let root = std::sync::Arc::clone(controller.root());
        drop(controller);

        self.adapter.set_node_hidden(&data.rule_id, true);
        self.adapter.place_placeholder(&data.rule_id, Relation::After);
        self.regions = compute_regions(&self.adapter.list_leaf_positions(&root));
        self.active = None;
        self.dragged = Some(data.clone());
        tracing::debug!(
            rule = %data.rule_id,
            from = %data.parent_group_id,
            regions = self.regions.len(),
            "rule drag started"
        );
        true
    }

    fn on_hover(&mut self, pointer: Position) -> bool {
        let Some(index) = hit_test(&self.regions, pointer) else {
            return false;
        };
        if self.active != Some(index) {
            self.active = Some(index);
            let region = &self.regions[index];
            self.adapter
                .place_placeholder(&region.anchor_id, region.relation);
            tracing::trace!(
                anchor = %region.anchor_id,
                relation = ?region.relation,
                group = %region.target_group_id,
                "drop region entered"
            );
        }
        true
    }

    fn on_release(&mut self, request: &DropRequest<'_>) -> Result<bool, DragListenerError> {
        let (Some(region), Some(dragged)) = (self.active_region(), self.dragged.as_ref()) else {
            return Ok(false);
        };
        let mut controller = self
            .controller
            .try_borrow_mut()
            .map_err(|_| DragListenerError::new("rule controller is already borrowed"))?;
        match controller.move_rule(
            &dragged.rule_id,
            &dragged.parent_group_id,
            &region.target_group_id,
            Some(region.anchor()),
        ) {
            Ok(()) => {
                controller.record_drop(dragged.rule_id.clone(), request.avatar_bounds);
                tracing::debug!(
                    rule = %dragged.rule_id,
                    to = %region.target_group_id,
                    anchor = %region.anchor_id,
                    "rule dropped"
                );
                Ok(true)
            }
            Err(err) => {
                tracing::debug!(rule = %dragged.rule_id, %err, "drop declined");
                Ok(false)
            }
        }
    }

    fn on_session_end(&mut self, _outcome: SessionOutcome) -> Result<(), DragListenerError> {
        if let Some(dragged) = self.dragged.take() {
            self.adapter.set_node_hidden(&dragged.rule_id, false);
        }
        self.adapter.remove_placeholder();
        self.active = None;
        self.regions.clear();
        Ok(())
    }
}
