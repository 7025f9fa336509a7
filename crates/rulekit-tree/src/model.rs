#![forbid(unsafe_code)]

//! Rule/group tree model.
//!
//! A tree is rooted at exactly one [`Group`]. Children are held as
//! [`Node`] values that wrap `Arc`s, so two roots produced by the editor
//! share every subtree the edit did not touch. Nodes are never mutated
//! after they become reachable from a root; the editor clones the ancestor
//! chain instead.
//!
//! # Invariants
//!
//! 1. Every [`NodeId`] in a tree is unique.
//! 2. A group never contains itself, directly or transitively.
//! 3. Dropping, comparing and walking a tree never recurse, so nesting depth
//!    is bounded by memory rather than by the call stack.

use std::borrow::{Borrow, Cow};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// Unique identifier of a rule or group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct NodeId(Arc<str>);

impl NodeId {
    /// Create an id from any string-like value.
    #[must_use]
    pub fn new(raw: impl Into<Arc<str>>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(raw: &str) -> Self {
        Self(Arc::from(raw))
    }
}

impl From<String> for NodeId {
    fn from(raw: String) -> Self {
        Self(Arc::from(raw))
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Comparison operator of a leaf rule.
///
/// The built-in operators are interned constants; equality is by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Operator {
    name: Cow<'static, str>,
    value: Cow<'static, str>,
}

impl Operator {
    /// `=`
    pub const EQUALS: Self = Self {
        name: Cow::Borrowed("equals"),
        value: Cow::Borrowed("="),
    };

    /// `!=`, named after the operator picker's label.
    pub const NOT_EQUALS: Self = Self {
        name: Cow::Borrowed("does not equal"),
        value: Cow::Borrowed("!="),
    };

    /// Create a custom operator.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, value: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Human-readable name, e.g. `"equals"`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Symbolic value, e.g. `"="`.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// How a group combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GroupOperator {
    /// Every child must match.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "AND"))]
    And,
    /// At least one child must match.
    #[cfg_attr(feature = "serde", serde(rename = "OR"))]
    Or,
}

impl GroupOperator {
    /// Canonical upper-case spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl fmt::Display for GroupOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`GroupOperator`] fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseGroupOperatorError {
    input: String,
}

impl fmt::Display for ParseGroupOperatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown group operator {:?} (expected AND or OR)", self.input)
    }
}

impl std::error::Error for ParseGroupOperatorError {}

impl FromStr for GroupOperator {
    type Err = ParseGroupOperatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("and") {
            Ok(Self::And)
        } else if s.eq_ignore_ascii_case("or") {
            Ok(Self::Or)
        } else {
            Err(ParseGroupOperatorError {
                input: s.to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// Free-form value a rule compares against.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(untagged))]
pub enum RuleValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("<null>"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for RuleValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RuleValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for RuleValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for RuleValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Leaf filter condition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rule {
    pub id: NodeId,
    pub name: String,
    pub operator: Operator,
    pub value: RuleValue,
}

impl Rule {
    /// Create a rule.
    #[must_use]
    pub fn new(
        id: impl Into<NodeId>,
        name: impl Into<String>,
        operator: Operator,
        value: impl Into<RuleValue>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            operator,
            value: value.into(),
        }
    }

    /// The row an "add filter" action inserts: an unnamed equality test
    /// with a fresh value.
    #[must_use]
    pub fn placeholder(id: NodeId) -> Self {
        let value = format!("new value {id}");
        Self {
            id,
            name: "attribute name".to_string(),
            operator: Operator::EQUALS,
            value: RuleValue::Text(value),
        }
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A child of a group: either a leaf rule or a nested group.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "kind", rename_all = "lowercase")
)]
pub enum Node {
    Rule(Arc<Rule>),
    Group(Arc<Group>),
}

impl Node {
    /// Id of the wrapped rule or group.
    #[must_use]
    pub fn id(&self) -> &NodeId {
        match self {
            Self::Rule(rule) => &rule.id,
            Self::Group(group) => &group.id,
        }
    }

    /// Returns true for nested groups.
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    #[must_use]
    pub fn as_rule(&self) -> Option<&Rule> {
        match self {
            Self::Rule(rule) => Some(rule),
            Self::Group(_) => None,
        }
    }

    #[must_use]
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Self::Group(group) => Some(group),
            Self::Rule(_) => None,
        }
    }

    /// Reference identity: both nodes point at the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Self::Rule(a), Self::Rule(b)) => Arc::ptr_eq(a, b),
            (Self::Group(a), Self::Group(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Ids of this node and, for groups, of every descendant.
    pub(crate) fn collect_ids(&self, out: &mut Vec<NodeId>) {
        out.push(self.id().clone());
        if let Self::Group(group) = self {
            out.extend(group.iter().map(|node| node.id().clone()));
        }
    }
}

impl From<Rule> for Node {
    fn from(rule: Rule) -> Self {
        Self::Rule(Arc::new(rule))
    }
}

impl From<Group> for Node {
    fn from(group: Group) -> Self {
        Self::Group(Arc::new(group))
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// Internal node combining its children under AND/OR.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Group {
    id: NodeId,
    #[cfg_attr(feature = "serde", serde(rename = "groupOperator"))]
    group_operator: GroupOperator,
    pub(crate) rules: Vec<Node>,
}

impl Group {
    /// Create an empty group.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, group_operator: GroupOperator) -> Self {
        Self {
            id: id.into(),
            group_operator,
            rules: Vec::new(),
        }
    }

    /// The group an "add group" action inserts: an AND group holding one
    /// starter rule.
    #[must_use]
    pub fn with_initial_rule(id: NodeId, rule: Rule) -> Self {
        Self::new(id, GroupOperator::And).child(rule)
    }

    /// Append a child while building a tree.
    #[must_use]
    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.rules.push(node.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    #[must_use]
    pub fn group_operator(&self) -> GroupOperator {
        self.group_operator
    }

    pub(crate) fn set_group_operator(&mut self, op: GroupOperator) {
        self.group_operator = op;
    }

    /// Direct children in order.
    #[must_use]
    pub fn rules(&self) -> &[Node] {
        &self.rules
    }

    /// Number of direct children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Position of the direct child with the given id.
    #[must_use]
    pub fn position_of(&self, id: &NodeId) -> Option<usize> {
        self.rules.iter().position(|node| node.id() == id)
    }

    /// Depth-first, document-order walk over every descendant (the group
    /// itself excluded).
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: vec![self.rules.iter()],
        }
    }

    /// Like [`iter`](Self::iter), but each step also carries the containing
    /// group and the nesting depth (direct children are at depth 0).
    #[must_use]
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(self, self.rules.iter())],
        }
    }

    /// Number of descendants.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Returns true if this group or any descendant carries `id`.
    #[must_use]
    pub fn contains_id(&self, id: &NodeId) -> bool {
        &self.id == id || self.iter().any(|node| node.id() == id)
    }

    /// Find this group or a descendant group by id.
    #[must_use]
    pub fn find_group(&self, id: &NodeId) -> Option<&Group> {
        if &self.id == id {
            return Some(self);
        }
        self.iter()
            .filter_map(Node::as_group)
            .find(|group| &group.id == id)
    }

    /// Find a descendant node by id.
    #[must_use]
    pub fn find_node(&self, id: &NodeId) -> Option<&Node> {
        self.iter().find(|node| node.id() == id)
    }

    /// The group whose direct children include `id`.
    #[must_use]
    pub fn parent_of(&self, id: &NodeId) -> Option<&Group> {
        if self.position_of(id).is_some() {
            return Some(self);
        }
        self.iter()
            .filter_map(Node::as_group)
            .find(|group| group.position_of(id).is_some())
    }

    /// First id that occurs more than once in the tree, if any.
    #[must_use]
    pub fn duplicate_id(&self) -> Option<NodeId> {
        let mut seen = HashSet::new();
        seen.insert(self.id.clone());
        self.iter()
            .map(Node::id)
            .find(|id| !seen.insert((*id).clone()))
            .cloned()
    }

    /// Deep content equality, ignoring allocation identity.
    ///
    /// Shared subtrees short-circuit on pointer equality.
    #[must_use]
    pub fn content_eq(&self, other: &Group) -> bool {
        let mut pending: Vec<(&Group, &Group)> = vec![(self, other)];
        while let Some((a, b)) = pending.pop() {
            if std::ptr::eq(a, b) {
                continue;
            }
            if a.id != b.id
                || a.group_operator != b.group_operator
                || a.rules.len() != b.rules.len()
            {
                return false;
            }
            for (left, right) in a.rules.iter().zip(&b.rules) {
                match (left, right) {
                    (Node::Rule(x), Node::Rule(y)) => {
                        if !Arc::ptr_eq(x, y) && **x != **y {
                            return false;
                        }
                    }
                    (Node::Group(x), Node::Group(y)) => pending.push((x.as_ref(), y.as_ref())),
                    _ => return false,
                }
            }
        }
        true
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.content_eq(other)
    }
}

impl Drop for Group {
    fn drop(&mut self) {
        // Unlink uniquely owned descendants onto a heap stack so that a deep
        // chain is released level by level instead of through nested drops.
        let mut stack = std::mem::take(&mut self.rules);
        while let Some(node) = stack.pop() {
            if let Node::Group(group) = node
                && let Some(mut group) = Arc::into_inner(group)
            {
                stack.append(&mut group.rules);
            }
        }
    }
}

/// Iterator returned by [`Group::iter`].
#[derive(Debug)]
pub struct Iter<'a> {
    stack: Vec<std::slice::Iter<'a, Node>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let level = self.stack.last_mut()?;
            match level.next() {
                Some(node) => {
                    if let Node::Group(group) = node {
                        self.stack.push(group.rules.iter());
                    }
                    return Some(node);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// One step of [`Group::walk`].
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub parent: &'a Group,
    pub node: &'a Node,
    pub depth: usize,
}

/// Iterator returned by [`Group::walk`].
#[derive(Debug)]
pub struct Walk<'a> {
    stack: Vec<(&'a Group, std::slice::Iter<'a, Node>)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let depth = self.stack.len().checked_sub(1)?;
            let (parent, level) = self.stack.last_mut()?;
            let parent: &'a Group = *parent;
            match level.next() {
                Some(node) => {
                    if let Node::Group(group) = node {
                        self.stack.push((&**group, group.rules.iter()));
                    }
                    return Some(Visit {
                        parent,
                        node,
                        depth,
                    });
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, value: &str) -> Rule {
        Rule::new(id, "Title", Operator::EQUALS, value)
    }

    fn sample() -> Group {
        Group::new("root", GroupOperator::Or)
            .child(rule("a", "Casey"))
            .child(
                Group::new("g1", GroupOperator::And)
                    .child(rule("b", "Sidney"))
                    .child(Group::new("g2", GroupOperator::Or).child(rule("c", "Jo"))),
            )
            .child(rule("d", "Alex"))
    }

    #[test]
    fn operators_compare_by_value() {
        assert_eq!(Operator::new("equals", "="), Operator::EQUALS);
        assert_ne!(Operator::EQUALS, Operator::NOT_EQUALS);
        assert_eq!(Operator::NOT_EQUALS.value(), "!=");
        assert_eq!(Operator::NOT_EQUALS.name(), "does not equal");
    }

    #[test]
    fn group_operator_parse_and_display() {
        assert_eq!("and".parse::<GroupOperator>(), Ok(GroupOperator::And));
        assert_eq!("OR".parse::<GroupOperator>(), Ok(GroupOperator::Or));
        assert!("xor".parse::<GroupOperator>().is_err());
        assert_eq!(GroupOperator::Or.to_string(), "OR");
    }

    #[test]
    fn rule_value_display() {
        assert_eq!(RuleValue::Null.to_string(), "<null>");
        assert_eq!(RuleValue::from("x").to_string(), "x");
        assert_eq!(RuleValue::from(true).to_string(), "true");
    }

    #[test]
    fn placeholder_rule_uses_equals() {
        let r = Rule::placeholder(NodeId::from("n-1"));
        assert_eq!(r.name, "attribute name");
        assert_eq!(r.operator, Operator::EQUALS);
        assert_eq!(r.value, RuleValue::Text("new value n-1".to_string()));
    }

    #[test]
    fn iter_is_document_order() {
        let root = sample();
        let ids: Vec<&str> = root.iter().map(|n| n.id().as_str()).collect();
        assert_eq!(ids, vec!["a", "g1", "b", "g2", "c", "d"]);
        assert_eq!(root.node_count(), 6);
    }

    #[test]
    fn walk_reports_parent_and_depth() {
        let root = sample();
        let steps: Vec<(&str, &str, usize)> = root
            .walk()
            .map(|v| (v.node.id().as_str(), v.parent.id().as_str(), v.depth))
            .collect();
        assert_eq!(
            steps,
            vec![
                ("a", "root", 0),
                ("g1", "root", 0),
                ("b", "g1", 1),
                ("g2", "g1", 1),
                ("c", "g2", 2),
                ("d", "root", 0),
            ]
        );
    }

    #[test]
    fn lookups() {
        let root = sample();
        assert_eq!(root.find_group(&"g2".into()).map(|g| g.rules().len()), Some(1));
        assert!(root.find_group(&"c".into()).is_none(), "rules are not groups");
        assert_eq!(root.find_node(&"c".into()).map(Node::is_group), Some(false));
        assert_eq!(root.parent_of(&"c".into()).map(|g| g.id().as_str()), Some("g2"));
        assert_eq!(root.parent_of(&"a".into()).map(|g| g.id().as_str()), Some("root"));
        assert!(root.parent_of(&"root".into()).is_none());
        assert!(root.contains_id(&"root".into()));
        assert!(!root.contains_id(&"zzz".into()));
    }

    #[test]
    fn duplicate_detection() {
        assert_eq!(sample().duplicate_id(), None);
        let dup = sample().child(rule("b", "again"));
        assert_eq!(dup.duplicate_id(), Some(NodeId::from("b")));
        let root_dup = sample().child(rule("root", "again"));
        assert_eq!(root_dup.duplicate_id(), Some(NodeId::from("root")));
    }

    #[test]
    fn content_eq_ignores_identity() {
        assert_eq!(sample(), sample());
        let other = Group::new("root", GroupOperator::And);
        assert_ne!(sample(), other);
    }

    #[test]
    fn ptr_eq_distinguishes_clones() {
        let node = Node::from(rule("a", "x"));
        let shared = node.clone();
        let copy = Node::from(rule("a", "x"));
        assert!(node.ptr_eq(&shared));
        assert!(!node.ptr_eq(&copy));
        assert_eq!(node, copy);
    }

    #[test]
    fn deep_chain_drops_and_compares_without_overflow() {
        fn chain(depth: usize) -> Group {
            let mut current = Group::new("g-0", GroupOperator::And).child(rule("leaf", "x"));
            for level in 1..depth {
                current = Group::new(format!("g-{level}"), GroupOperator::And).child(current);
            }
            current
        }
        let a = chain(10_000);
        let b = chain(10_000);
        assert!(a.content_eq(&b));
        assert_eq!(a.node_count(), 10_000);
        drop(a);
        drop(b);
    }
}
