#![forbid(unsafe_code)]

//! Drag-and-drop coordination for rulekit.
//!
//! [`drag`] is renderer-agnostic: a [`DragManager`] runs one session at a
//! time and negotiates with registered [`DragListener`]s. [`drop_region`]
//! provides the listener that maps pointer positions onto rule-tree moves.

pub mod drag;
pub mod drop_region;

pub use drag::{
    DragAvatar, DragConfig, DragDispatch, DragError, DragInput, DragListener, DragListenerError,
    DragManager, DragPayload, DragSession, DropRequest, ListenerId, SessionOutcome, SharedListener,
};
pub use drop_region::{
    DropRegion, DropRegionResolver, LeafPosition, RULE_DRAG_KIND, RuleDragData, ViewAdapter,
    compute_regions, hit_test,
};
