#![forbid(unsafe_code)]

//! Rulekit public facade crate.
//!
//! Re-exports the tree editor and the drag protocol under one roof, with a
//! prelude for hosts that wire both together.

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use rulekit_core::{Position, Rect};

// --- Tree re-exports -------------------------------------------------------

pub use rulekit_tree::{
    Anchor, DropState, EditError, Group, GroupOperator, History, Node, NodeId, NodeIdAllocator,
    Operator, Relation, Rule, RuleController, RuleValue,
};

// --- Drag re-exports -------------------------------------------------------

pub use rulekit_dnd::{
    DragAvatar, DragConfig, DragDispatch, DragError, DragInput, DragListener, DragListenerError,
    DragManager, DragPayload, DropRegion, DropRegionResolver, LeafPosition, ListenerId,
    RuleDragData, SessionOutcome, SharedListener, ViewAdapter,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for rulekit hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A tree edit was rejected.
    Edit(EditError),
    /// The drag manager refused a request.
    Drag(DragError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Edit(err) => write!(f, "{err}"),
            Self::Drag(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Edit(err) => Some(err),
            Self::Drag(err) => Some(err),
        }
    }
}

impl From<EditError> for Error {
    fn from(err: EditError) -> Self {
        Self::Edit(err)
    }
}

impl From<DragError> for Error {
    fn from(err: DragError) -> Self {
        Self::Drag(err)
    }
}

/// Standard result type for rulekit APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Anchor, DragInput, DragManager, DragPayload, DropRegionResolver, Error, Group,
        GroupOperator, NodeId, Operator, Position, Rect, Relation, Result, Rule, RuleController,
        RuleDragData, ViewAdapter,
    };

    pub use crate::{core, dnd, tree};
}

pub use rulekit_core as core;
pub use rulekit_dnd as dnd;
pub use rulekit_tree as tree;
