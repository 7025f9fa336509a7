#![forbid(unsafe_code)]

//! Structured reasons a tree edit was rejected.
//!
//! A rejected edit never produces a new root: callers keep the root they
//! passed in, and the controller leaves its history slots untouched.

use std::fmt;

use crate::model::NodeId;

/// Why an edit left the tree unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// The referenced group is not in the tree.
    GroupNotFound { group_id: NodeId },
    /// The referenced node is not a direct child of the named group.
    NodeNotFound { node_id: NodeId, group_id: NodeId },
    /// The inserted subtree reuses an id already present in the tree (or
    /// repeats one internally).
    DuplicateId { node_id: NodeId },
    /// Moving `group_id` into `target_group_id` would nest a group inside
    /// itself.
    WouldCreateCycle {
        group_id: NodeId,
        target_group_id: NodeId,
    },
}

impl EditError {
    /// True for the two lookup failures.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::GroupNotFound { .. } | Self::NodeNotFound { .. })
    }
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupNotFound { group_id } => write!(f, "group {group_id} not found"),
            Self::NodeNotFound { node_id, group_id } => {
                write!(f, "node {node_id} is not a child of group {group_id}")
            }
            Self::DuplicateId { node_id } => write!(f, "id {node_id} is already in the tree"),
            Self::WouldCreateCycle {
                group_id,
                target_group_id,
            } => write!(
                f,
                "moving group {group_id} into {target_group_id} would nest it inside itself"
            ),
        }
    }
}

impl std::error::Error for EditError {}
