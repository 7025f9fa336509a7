//! Text outline of a rule tree.
//!
//! Row 0 is the root header; every descendant then takes one line in
//! document order, indented two columns per level. A line spans
//! `row_height` screen rows, so leaf bounds are what a terminal renderer
//! would hand the drop-region resolver.

use std::collections::BTreeSet;

use rulekit::{Group, LeafPosition, Node, NodeId, Rect, Relation, ViewAdapter};

/// Columns available to the outline.
pub const OUTLINE_WIDTH: u16 = 48;
const INDENT: u16 = 2;

#[derive(Debug, Clone, Default)]
pub struct TextLayout {
    row_height: u16,
    placeholder: Option<(NodeId, Relation)>,
    hidden: BTreeSet<NodeId>,
}

impl TextLayout {
    #[must_use]
    pub fn new(row_height: u16) -> Self {
        Self {
            row_height: row_height.max(1),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn row_height(&self) -> u16 {
        self.row_height
    }

    #[must_use]
    pub fn placeholder(&self) -> Option<&(NodeId, Relation)> {
        self.placeholder.as_ref()
    }

    #[must_use]
    pub fn is_hidden(&self, id: &NodeId) -> bool {
        self.hidden.contains(id)
    }

    /// One string per outline line, including the placeholder marker.
    #[must_use]
    pub fn render(&self, root: &Group) -> Vec<String> {
        let mut lines = vec![format!("{} ({})", root.id(), root.group_operator())];
        for visit in root.walk() {
            let indent = " ".repeat(usize::from(INDENT) * (visit.depth + 1));
            let placeholder = self
                .placeholder
                .as_ref()
                .filter(|(anchor, _)| anchor == visit.node.id())
                .map(|(_, relation)| *relation);
            let marker = format!("{indent}-- drop here --");

            if placeholder == Some(Relation::Before) {
                lines.push(marker.clone());
            }
            let mut line = format!("{indent}{}", describe(visit.node));
            if self.is_hidden(visit.node.id()) {
                line.push_str(" [dragging]");
            }
            lines.push(line);
            if placeholder == Some(Relation::After) {
                lines.push(marker);
            }
        }
        lines
    }
}

fn describe(node: &Node) -> String {
    match node {
        Node::Rule(rule) => format!(
            "{}: {} {} {}",
            rule.id,
            rule.name,
            rule.operator.value(),
            rule.value
        ),
        Node::Group(group) => format!("{} ({})", group.id(), group.group_operator()),
    }
}

impl ViewAdapter for TextLayout {
    fn list_leaf_positions(&self, root: &Group) -> Vec<LeafPosition> {
        root.walk()
            .enumerate()
            .filter(|(_, visit)| !visit.node.is_group())
            .map(|(index, visit)| {
                let line = u16::try_from(index + 1).unwrap_or(u16::MAX);
                let x = INDENT.saturating_mul(u16::try_from(visit.depth + 1).unwrap_or(u16::MAX));
                LeafPosition {
                    id: visit.node.id().clone(),
                    containing_group_id: visit.parent.id().clone(),
                    bounds: Rect::new(
                        x,
                        line.saturating_mul(self.row_height),
                        OUTLINE_WIDTH.saturating_sub(x),
                        self.row_height,
                    ),
                }
            })
            .collect()
    }

    fn place_placeholder(&mut self, anchor_id: &NodeId, relation: Relation) {
        self.placeholder = Some((anchor_id.clone(), relation));
    }

    fn remove_placeholder(&mut self) {
        self.placeholder = None;
    }

    fn set_node_hidden(&mut self, id: &NodeId, hidden: bool) {
        if hidden {
            self.hidden.insert(id.clone());
        } else {
            self.hidden.remove(id);
        }
    }
}
