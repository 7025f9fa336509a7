#![forbid(unsafe_code)]

//! Fresh id allocation for inserted nodes.

use crate::model::{Group, NodeId};

/// Default prefix for allocated ids.
pub const DEFAULT_ID_PREFIX: &str = "node";

/// Allocates `"{prefix}-{n}"` ids with a monotonically increasing counter.
///
/// Seed it from an existing tree with [`NodeIdAllocator::from_tree`] so it
/// never hands out an id that tree already uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdAllocator {
    prefix: String,
    next: u64,
}

impl NodeIdAllocator {
    /// Start counting at 1 under `prefix`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }

    /// Start past the highest `"{prefix}-{n}"` id found in `root`.
    #[must_use]
    pub fn from_tree(prefix: impl Into<String>, root: &Group) -> Self {
        let mut allocator = Self::new(prefix);
        let highest = std::iter::once(root.id())
            .chain(root.iter().map(|node| node.id()))
            .filter_map(|id| allocator.counter_of(id))
            .max();
        if let Some(highest) = highest {
            allocator.next = highest.saturating_add(1);
        }
        allocator
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Hand out the next id.
    pub fn allocate(&mut self) -> NodeId {
        let id = NodeId::from(format!("{}-{}", self.prefix, self.next));
        self.next = self.next.saturating_add(1);
        id
    }

    fn counter_of(&self, id: &NodeId) -> Option<u64> {
        id.as_str()
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix('-')?
            .parse()
            .ok()
    }
}
