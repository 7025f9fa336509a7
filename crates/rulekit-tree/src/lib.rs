#![forbid(unsafe_code)]

//! Rule/group trees for the rulekit editor.
//!
//! - [`model`]: immutable, `Arc`-shared tree types.
//! - [`edit`]: pure copy-on-write edits returning a new root.
//! - [`history`]: depth-one undo/redo over roots.
//! - [`controller`]: the stateful surface a view layer drives.

pub mod controller;
pub mod edit;
pub mod error;
pub mod history;
pub mod id;
pub mod model;

pub use controller::{DropState, RuleController};
pub use edit::{Anchor, EditResult, Relation};
pub use error::EditError;
pub use history::History;
pub use id::{DEFAULT_ID_PREFIX, NodeIdAllocator};
pub use model::{
    Group, GroupOperator, Node, NodeId, Operator, ParseGroupOperatorError, Rule, RuleValue, Visit,
};
