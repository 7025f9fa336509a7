#![forbid(unsafe_code)]

//! Depth-one undo/redo over immutable roots.
//!
//! # Invariants
//!
//! 1. At most one undo and one redo root are retained.
//! 2. Committing a new root clears redo.
//! 3. Undo followed by redo restores the exact same `Arc` (reference
//!    identity, not just content).
//! 4. Undo or redo with an empty slot is a no-op.

use std::sync::Arc;

use crate::model::Group;

/// Current root plus one step of undo and redo.
#[derive(Debug, Clone)]
pub struct History {
    current: Arc<Group>,
    undo_slot: Option<Arc<Group>>,
    redo_slot: Option<Arc<Group>>,
}

impl History {
    #[must_use]
    pub fn new(root: Arc<Group>) -> Self {
        Self {
            current: root,
            undo_slot: None,
            redo_slot: None,
        }
    }

    #[must_use]
    pub fn current(&self) -> &Arc<Group> {
        &self.current
    }

    /// Make `root` current. The previous root becomes the undo slot and redo
    /// is cleared.
    ///
    /// Returns false (and records nothing) when `root` is the current root.
    pub fn commit(&mut self, root: Arc<Group>) -> bool {
        if Arc::ptr_eq(&root, &self.current) {
            return false;
        }
        let previous = std::mem::replace(&mut self.current, root);
        self.undo_slot = Some(previous);
        self.redo_slot = None;
        true
    }

    /// Step back one root. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo_slot.take() else {
            return false;
        };
        let undone = std::mem::replace(&mut self.current, previous);
        self.redo_slot = Some(undone);
        true
    }

    /// Re-apply the last undone root. Returns false when there is nothing to
    /// redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo_slot.take() else {
            return false;
        };
        let replaced = std::mem::replace(&mut self.current, next);
        self.undo_slot = Some(replaced);
        true
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.undo_slot.is_some()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.redo_slot.is_some()
    }
}
