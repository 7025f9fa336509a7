#![forbid(unsafe_code)]

//! Copy-on-write tree editing.
//!
//! Every function takes the current root and returns either an error (the
//! caller keeps its root) or a root for the edited tree. Inputs are never
//! mutated.
//!
//! # Path cloning
//!
//! An edit is compiled into per-group edits addressed by root→group index
//! paths. The groups on the union of those paths are shallow-cloned once
//! (the clone shares every child `Arc`) into a small trie, recorded parent
//! before child. Reassembly walks that record from the back:
//!
//! 1. take the most recently recorded clone, whose cloned children are all
//!    already spliced in,
//! 2. apply its edits,
//! 3. wrap it in an `Arc` and splice it into its parent clone at the
//!    original child index.
//!
//! Because a group's edits run only after its cloned children are back in
//! place, index shifts from a removal or insertion can never misaddress a
//! child, and a move whose source group is an ancestor or descendant of its
//! destination is produced in a single pass.
//!
//! Every subtree off those paths stays reference-identical to the input.
//!
//! # Invariants
//!
//! 1. A returned root is either the input `Arc` itself (nothing changed) or
//!    a fresh root; no node reachable from the input is modified.
//! 2. Ids stay unique: inserting an id the tree already holds is rejected.
//! 3. A group is never moved into itself or one of its descendants.
//! 4. No traversal recurses.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::EditError;
use crate::model::{Group, GroupOperator, Node, NodeId};

/// Result of an edit: the new root, or the reason the tree is unchanged.
pub type EditResult = Result<Arc<Group>, EditError>;

/// Side of an anchor sibling to insert on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Relation {
    Before,
    After,
}

/// An existing sibling used as an insertion reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Anchor {
    pub id: NodeId,
    pub relation: Relation,
}

impl Anchor {
    #[must_use]
    pub fn before(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            relation: Relation::Before,
        }
    }

    #[must_use]
    pub fn after(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            relation: Relation::After,
        }
    }
}

// ---------------------------------------------------------------------------
// Public operations
// ---------------------------------------------------------------------------

/// Insert `node` into the group `to_group`.
///
/// Groups are appended. Leaf rules go immediately before the first child
/// group, so rules keep preceding subgroups; with no child group they are
/// appended.
pub fn add_rule(root: &Arc<Group>, node: Node, to_group: &NodeId) -> EditResult {
    if let Some(node_id) = first_conflicting_id(root, &node) {
        return Err(EditError::DuplicateId { node_id });
    }
    let path = locate_group(root, to_group)?;
    let at = if node.is_group() {
        InsertAt::End
    } else {
        InsertAt::BeforeFirstGroup
    };
    rewrite(root, vec![(path, GroupEdit::Insert { node, at })], to_group)
}

/// Remove the direct child `node_id` from `from_group`, keeping the order of
/// the remaining siblings.
pub fn remove_rule(root: &Arc<Group>, node_id: &NodeId, from_group: &NodeId) -> EditResult {
    let path = locate_group(root, from_group)?;
    let group = group_at(root, &path).ok_or_else(|| not_found(from_group))?;
    if group.position_of(node_id).is_none() {
        return Err(EditError::NodeNotFound {
            node_id: node_id.clone(),
            group_id: from_group.clone(),
        });
    }
    rewrite(
        root,
        vec![(
            path,
            GroupEdit::Remove {
                node_id: node_id.clone(),
            },
        )],
        from_group,
    )
}

/// Replace the combinator of `group_id`, sharing all of its children.
///
/// Setting the operator a group already has returns `root` itself.
pub fn set_group_operator(root: &Arc<Group>, group_id: &NodeId, op: GroupOperator) -> EditResult {
    let path = locate_group(root, group_id)?;
    let group = group_at(root, &path).ok_or_else(|| not_found(group_id))?;
    if group.group_operator() == op {
        return Ok(Arc::clone(root));
    }
    rewrite(root, vec![(path, GroupEdit::SetOperator(op))], group_id)
}

/// Move the direct child `node_id` of `from_group` into `to_group`.
///
/// Without an anchor the node is appended. With an anchor it lands
/// immediately before or after that sibling; an anchor that is not a child
/// of `to_group` falls back to appending. A move that would leave the node
/// where it already is returns `root` itself.
///
/// Anchoring a node to itself within its own group counts as landing in
/// place: the node keeps its slot instead of being appended.
pub fn move_rule(
    root: &Arc<Group>,
    node_id: &NodeId,
    from_group: &NodeId,
    to_group: &NodeId,
    anchor: Option<Anchor>,
) -> EditResult {
    let mut paths = locate_groups(root, &[from_group, to_group]).into_iter();
    let from_path = paths.next().flatten().ok_or_else(|| not_found(from_group))?;
    let to_path = paths.next().flatten().ok_or_else(|| not_found(to_group))?;

    let source = group_at(root, &from_path).ok_or_else(|| not_found(from_group))?;
    let Some(slot) = source.position_of(node_id) else {
        return Err(EditError::NodeNotFound {
            node_id: node_id.clone(),
            group_id: from_group.clone(),
        });
    };
    let node = source.rules()[slot].clone();

    // The moved group's own path is `from_path + [slot]`.
    if node.is_group()
        && to_path.len() > from_path.len()
        && to_path.starts_with(&from_path)
        && to_path[from_path.len()] == slot
    {
        return Err(EditError::WouldCreateCycle {
            group_id: node_id.clone(),
            target_group_id: to_group.clone(),
        });
    }

    if from_path == to_path && lands_in_place(source, slot, anchor.as_ref()) {
        return Ok(Arc::clone(root));
    }

    let at = anchor.map_or(InsertAt::End, InsertAt::Anchored);
    rewrite(
        root,
        vec![
            (
                from_path,
                GroupEdit::Remove {
                    node_id: node_id.clone(),
                },
            ),
            (to_path, GroupEdit::Insert { node, at }),
        ],
        to_group,
    )
}

// ---------------------------------------------------------------------------
// Group edits
// ---------------------------------------------------------------------------

/// Root→group child indices.
type Path = Vec<usize>;

#[derive(Debug)]
enum InsertAt {
    BeforeFirstGroup,
    End,
    Anchored(Anchor),
}

#[derive(Debug)]
enum GroupEdit {
    Insert { node: Node, at: InsertAt },
    Remove { node_id: NodeId },
    SetOperator(GroupOperator),
}

impl GroupEdit {
    fn apply(self, group: &mut Group) {
        match self {
            Self::Insert { node, at } => {
                let index = match at {
                    InsertAt::End => None,
                    InsertAt::BeforeFirstGroup => group.rules.iter().position(Node::is_group),
                    InsertAt::Anchored(anchor) => {
                        group
                            .position_of(&anchor.id)
                            .map(|index| match anchor.relation {
                                Relation::Before => index,
                                Relation::After => index + 1,
                            })
                    }
                };
                match index {
                    Some(index) => group.rules.insert(index, node),
                    None => group.rules.push(node),
                }
            }
            Self::Remove { node_id } => {
                if let Some(index) = group.position_of(&node_id) {
                    group.rules.remove(index);
                }
            }
            Self::SetOperator(op) => group.set_group_operator(op),
        }
    }
}

/// Whether moving the child at `slot` within its own group is a no-op.
fn lands_in_place(group: &Group, slot: usize, anchor: Option<&Anchor>) -> bool {
    let last = group.rules().len() - 1;
    let Some(anchor) = anchor else {
        return slot == last;
    };
    if &anchor.id == group.rules()[slot].id() {
        return true;
    }
    let Some(anchor_index) = group.position_of(&anchor.id) else {
        return slot == last;
    };
    // Index the anchor will have once the moved node is taken out.
    let anchor_after_removal = if anchor_index > slot {
        anchor_index - 1
    } else {
        anchor_index
    };
    let target = match anchor.relation {
        Relation::Before => anchor_after_removal,
        Relation::After => anchor_after_removal + 1,
    };
    target == slot
}

/// A cloned group on an edit path.
struct PathClone {
    group: Group,
    parent: Option<usize>,
    slot: usize,
    /// `(child slot, clone index)` for cloned children.
    children: Vec<(usize, usize)>,
    edits: Vec<GroupEdit>,
}

/// Clone the groups on every edit path, apply the edits, and reassemble.
fn rewrite(root: &Arc<Group>, edits: Vec<(Path, GroupEdit)>, subject: &NodeId) -> EditResult {
    let mut clones = vec![PathClone {
        group: Group::clone(root),
        parent: None,
        slot: 0,
        children: Vec::new(),
        edits: Vec::new(),
    }];

    for (path, edit) in edits {
        let mut at = 0;
        let mut source: &Group = root;
        for &slot in &path {
            source = source
                .rules()
                .get(slot)
                .and_then(Node::as_group)
                .ok_or_else(|| not_found(subject))?;
            let known = clones[at]
                .children
                .iter()
                .find_map(|&(child_slot, index)| (child_slot == slot).then_some(index));
            at = match known {
                Some(index) => index,
                None => {
                    let index = clones.len();
                    clones.push(PathClone {
                        group: source.clone(),
                        parent: Some(at),
                        slot,
                        children: Vec::new(),
                        edits: Vec::new(),
                    });
                    clones[at].children.push((slot, index));
                    index
                }
            };
        }
        clones[at].edits.push(edit);
    }

    // Parents precede their children, so popping finishes children first.
    while let Some(PathClone {
        mut group,
        parent,
        slot,
        edits,
        ..
    }) = clones.pop()
    {
        for edit in edits {
            edit.apply(&mut group);
        }
        let rebuilt = Arc::new(group);
        let Some(parent) = parent else {
            return Ok(rebuilt);
        };
        let child = clones
            .get_mut(parent)
            .and_then(|entry| entry.group.rules.get_mut(slot))
            .ok_or_else(|| not_found(subject))?;
        *child = Node::Group(rebuilt);
    }
    Err(not_found(subject))
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

fn not_found(group_id: &NodeId) -> EditError {
    EditError::GroupNotFound {
        group_id: group_id.clone(),
    }
}

fn locate_group(root: &Group, group_id: &NodeId) -> Result<Path, EditError> {
    locate_groups(root, &[group_id])
        .pop()
        .flatten()
        .ok_or_else(|| not_found(group_id))
}

struct Frame<'a> {
    group: &'a Group,
    parent: Option<usize>,
    slot: usize,
}

/// Breadth-first search for several groups in one scan.
///
/// Frames record their parent frame, so a path is rebuilt only for the
/// groups actually found and memory stays linear in the number of groups.
fn locate_groups(root: &Group, wanted: &[&NodeId]) -> Vec<Option<Path>> {
    let mut found: Vec<Option<usize>> = vec![None; wanted.len()];
    let mut remaining = wanted.len();
    let mut frames = vec![Frame {
        group: root,
        parent: None,
        slot: 0,
    }];
    let mut cursor = 0;

    while cursor < frames.len() && remaining > 0 {
        let group = frames[cursor].group;
        for (index, id) in wanted.iter().enumerate() {
            if found[index].is_none() && group.id() == *id {
                found[index] = Some(cursor);
                remaining -= 1;
            }
        }
        for (slot, child) in group.rules().iter().enumerate() {
            if let Node::Group(child) = child {
                frames.push(Frame {
                    group: child,
                    parent: Some(cursor),
                    slot,
                });
            }
        }
        cursor += 1;
    }

    found
        .into_iter()
        .map(|frame| frame.map(|frame| path_to(&frames, frame)))
        .collect()
}

fn path_to(frames: &[Frame<'_>], mut index: usize) -> Path {
    let mut path = Vec::new();
    while let Some(parent) = frames[index].parent {
        path.push(frames[index].slot);
        index = parent;
    }
    path.reverse();
    path
}

fn group_at<'a>(root: &'a Group, path: &[usize]) -> Option<&'a Group> {
    let mut group = root;
    for &slot in path {
        group = group.rules().get(slot)?.as_group()?;
    }
    Some(group)
}

/// First id of `node`'s subtree that collides with the tree or repeats
/// within the subtree itself.
fn first_conflicting_id(root: &Group, node: &Node) -> Option<NodeId> {
    let mut incoming = Vec::new();
    node.collect_ids(&mut incoming);

    let mut unique = HashSet::with_capacity(incoming.len());
    for id in &incoming {
        if !unique.insert(id) {
            return Some(id.clone());
        }
    }

    std::iter::once(root.id())
        .chain(root.iter().map(Node::id))
        .find(|id| unique.contains(id))
        .cloned()
}
