//! Property-based invariant tests for copy-on-write tree edits.
//!
//! 1. Edits that reference an unknown id are rejected and leave the root alone.
//! 2. Adding a rule shares every subtree off the root→target path.
//! 3. Ids stay unique under any sequence of controller operations.
//! 4. A move preserves the set of ids and the moved subtree's identity.
//! 5. Moving a group into itself or a descendant is always rejected.

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;
use proptest::sample::Index;
use rulekit_tree::edit::{self, Anchor, Relation};
use rulekit_tree::{EditError, Group, GroupOperator, Node, NodeId, Operator, Rule, RuleController};

// ── Tree generation ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Shape {
    Leaf,
    Group(bool, Vec<Shape>),
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    Just(Shape::Leaf).prop_recursive(4, 40, 5, |inner| {
        (any::<bool>(), prop::collection::vec(inner, 0..5))
            .prop_map(|(or, children)| Shape::Group(or, children))
    })
}

fn tree_strategy() -> impl Strategy<Value = Arc<Group>> {
    (any::<bool>(), prop::collection::vec(shape_strategy(), 0..6)).prop_map(|(or, children)| {
        let mut next = 0;
        Arc::new(build_group("root".to_string(), or, children, &mut next))
    })
}

fn combinator(or: bool) -> GroupOperator {
    if or { GroupOperator::Or } else { GroupOperator::And }
}

fn build_group(id: String, or: bool, children: Vec<Shape>, next: &mut usize) -> Group {
    let mut group = Group::new(id, combinator(or));
    for child in children {
        *next += 1;
        let id = format!("n{next}");
        group = match child {
            Shape::Leaf => group.child(Rule::new(id, "Title", Operator::EQUALS, "v")),
            Shape::Group(or, nested) => group.child(build_group(id, or, nested, next)),
        };
    }
    group
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn group_ids(root: &Group) -> Vec<NodeId> {
    std::iter::once(root.id().clone())
        .chain(root.iter().filter(|n| n.is_group()).map(|n| n.id().clone()))
        .collect()
}

fn node_ids(root: &Group) -> Vec<NodeId> {
    root.iter().map(|n| n.id().clone()).collect()
}

fn id_set(root: &Group) -> BTreeSet<NodeId> {
    std::iter::once(root.id().clone())
        .chain(node_ids(root))
        .collect()
}

// ── Properties ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn unknown_ids_are_rejected(root in tree_strategy(), pick in any::<Index>()) {
        let missing = NodeId::from("missing");
        let groups = group_ids(&root);
        let group = pick.get(&groups);
        let rule = Rule::new("fresh", "Title", Operator::EQUALS, "v");

        let err = edit::add_rule(&root, rule.into(), &missing).unwrap_err();
        prop_assert!(err.is_not_found());
        let err = edit::remove_rule(&root, &missing, group).unwrap_err();
        prop_assert!(err.is_not_found());
        let err = edit::set_group_operator(&root, &missing, GroupOperator::And).unwrap_err();
        prop_assert!(err.is_not_found());
        let err = edit::move_rule(&root, &missing, group, group, None).unwrap_err();
        prop_assert!(err.is_not_found());
        let err = edit::move_rule(&root, &missing, &missing, group, None).unwrap_err();
        prop_assert!(err.is_not_found());

        let mut controller = RuleController::from_root(Arc::clone(&root));
        prop_assert!(controller.remove_rule(&missing, group).is_err());
        prop_assert!(Arc::ptr_eq(controller.root(), &root));
        prop_assert!(!controller.can_undo());
    }
}

proptest! {
    #[test]
    fn add_rule_shares_off_path_subtrees(root in tree_strategy(), pick in any::<Index>()) {
        let groups = group_ids(&root);
        let target = pick.get(&groups).clone();
        let rule = Rule::new("fresh", "Title", Operator::EQUALS, "v");
        let out = edit::add_rule(&root, rule.into(), &target).expect("target exists");

        prop_assert_eq!(out.node_count(), root.node_count() + 1);
        for old in root.iter() {
            let on_path = old.as_group().is_some_and(|g| g.contains_id(&target));
            if on_path {
                continue;
            }
            let new = out.find_node(old.id()).expect("node survives");
            prop_assert!(old.ptr_eq(new), "{} should be shared", old.id());
        }
    }
}

proptest! {
    #[test]
    fn move_preserves_ids_and_identity(
        root in tree_strategy(),
        node_pick in any::<Index>(),
        target_pick in any::<Index>(),
        anchor_pick in any::<Index>(),
        anchored in any::<bool>(),
        after in any::<bool>(),
    ) {
        let nodes = node_ids(&root);
        prop_assume!(!nodes.is_empty());
        let node_id = node_pick.get(&nodes).clone();
        let from = root.parent_of(&node_id).expect("non-root node has a parent").id().clone();
        let groups = group_ids(&root);
        let to = target_pick.get(&groups).clone();
        let anchor = root
            .find_group(&to)
            .filter(|g| anchored && !g.is_empty())
            .map(|g| Anchor {
                id: anchor_pick.get(g.rules()).id().clone(),
                relation: if after { Relation::After } else { Relation::Before },
            });

        let moved = root.find_node(&node_id).expect("picked from tree").clone();
        let result = edit::move_rule(&root, &node_id, &from, &to, anchor);

        let into_self = moved.as_group().is_some_and(|g| g.contains_id(&to));
        if into_self {
            let is_cycle = matches!(result, Err(EditError::WouldCreateCycle { .. }));
            prop_assert!(is_cycle);
            return Ok(());
        }

        let out = result.expect("valid move");
        prop_assert_eq!(id_set(&out), id_set(&root));
        prop_assert_eq!(out.node_count(), root.node_count());
        prop_assert_eq!(out.duplicate_id(), None);
        let parent = out.parent_of(&node_id).expect("moved node is placed");
        prop_assert_eq!(parent.id(), &to);
        let landed = out.find_node(&node_id).expect("moved node is placed");
        prop_assert!(landed.ptr_eq(&moved));
    }
}

#[derive(Debug, Clone)]
enum Op {
    AddRule(Index),
    AddGroup(Index),
    Remove(Index),
    Move(Index, Index),
    Toggle(Index),
    Undo,
    Redo,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<Index>().prop_map(Op::AddRule),
        any::<Index>().prop_map(Op::AddGroup),
        any::<Index>().prop_map(Op::Remove),
        (any::<Index>(), any::<Index>()).prop_map(|(a, b)| Op::Move(a, b)),
        any::<Index>().prop_map(Op::Toggle),
        Just(Op::Undo),
        Just(Op::Redo),
    ]
}

fn run_op(controller: &mut RuleController, op: Op) {
    let root = Arc::clone(controller.root());
    let groups = group_ids(&root);
    let nodes = node_ids(&root);
    match op {
        Op::AddRule(g) => {
            let _ = controller.add_default_rule(g.get(&groups));
        }
        Op::AddGroup(g) => {
            let _ = controller.add_default_group(g.get(&groups));
        }
        Op::Remove(n) if !nodes.is_empty() => {
            let id = n.get(&nodes);
            if let Some(parent) = root.parent_of(id) {
                let _ = controller.remove_rule(id, parent.id());
            }
        }
        Op::Move(n, g) if !nodes.is_empty() => {
            let id = n.get(&nodes);
            if let Some(parent) = root.parent_of(id) {
                let _ = controller.move_rule(id, parent.id(), g.get(&groups), None);
            }
        }
        Op::Toggle(g) => {
            let id = g.get(&groups);
            let op = match root.find_group(id).map(Group::group_operator) {
                Some(GroupOperator::And) => GroupOperator::Or,
                _ => GroupOperator::And,
            };
            let _ = controller.set_group_operator(id, op);
        }
        Op::Undo => {
            controller.undo();
        }
        Op::Redo => {
            controller.redo();
        }
        Op::Remove(_) | Op::Move(..) => {}
    }
}

proptest! {
    #[test]
    fn ids_stay_unique(root in tree_strategy(), ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut controller = RuleController::from_root(root);
        for op in ops {
            run_op(&mut controller, op);
            prop_assert_eq!(controller.root().duplicate_id(), None);
            controller.flush_deferred();
        }
    }
}

proptest! {
    #[test]
    fn groups_never_move_into_their_own_subtree(root in tree_strategy(), pick in any::<Index>()) {
        let nested: Vec<&Node> = root.iter().filter(|n| n.is_group()).collect();
        prop_assume!(!nested.is_empty());
        let group = pick.get(&nested).as_group().expect("filtered to groups");
        let from = root.parent_of(group.id()).expect("nested group has a parent").id().clone();
        for target in group_ids(group) {
            let result = edit::move_rule(&root, group.id(), &from, &target, None);
            let is_cycle = matches!(result, Err(EditError::WouldCreateCycle { .. }));
            prop_assert!(is_cycle, "moving {} into {} must be rejected", group.id(), target);
        }
    }
}
