#![forbid(unsafe_code)]

//! Building blocks for the headless rulekit harness.
//!
//! - [`config`]: environment-driven settings.
//! - [`layout`]: a text outline that doubles as the drop-region view adapter.
//! - [`replay`]: a scripted drag through [`rulekit::DragManager`].

pub mod config;
pub mod layout;
pub mod replay;

use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;

use rulekit::{Group, GroupOperator, Node, NodeId, Operator, Rule};

pub use config::HarnessConfig;
pub use layout::TextLayout;
pub use replay::{ReplayReport, replay_first_to_last};

/// Errors surfaced by the harness binary.
#[derive(Debug)]
pub enum HarnessError {
    Io(io::Error),
    Json(serde_json::Error),
    /// The loaded document reuses an id.
    DuplicateId(NodeId),
    /// The loaded document's top-level node is a rule.
    RootNotGroup(NodeId),
    Rulekit(rulekit::Error),
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Json(err) => write!(f, "invalid tree document: {err}"),
            Self::DuplicateId(id) => write!(f, "tree document repeats id {id}"),
            Self::RootNotGroup(id) => write!(f, "tree document root {id} is not a group"),
            Self::Rulekit(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::DuplicateId(_) | Self::RootNotGroup(_) => None,
            Self::Rulekit(err) => Some(err),
        }
    }
}

impl From<io::Error> for HarnessError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<rulekit::Error> for HarnessError {
    fn from(err: rulekit::Error) -> Self {
        Self::Rulekit(err)
    }
}

/// `Title = Casey OR Title = Sidney OR (Team = core AND Level = 3)`.
#[must_use]
pub fn demo_tree() -> Group {
    Group::new("root", GroupOperator::Or)
        .child(Rule::new("casey", "Title", Operator::EQUALS, "Casey"))
        .child(Rule::new("sidney", "Title", Operator::EQUALS, "Sidney"))
        .child(
            Group::new("team", GroupOperator::And)
                .child(Rule::new("core", "Team", Operator::EQUALS, "core"))
                .child(Rule::new("level", "Level", Operator::NOT_EQUALS, 3.0)),
        )
}

/// Parse a `"kind":"group"` JSON tree document, rejecting repeated ids.
pub fn parse_tree(json: &str) -> Result<Group, HarnessError> {
    let root = match serde_json::from_str::<Node>(json)? {
        Node::Group(group) => Arc::unwrap_or_clone(group),
        Node::Rule(rule) => return Err(HarnessError::RootNotGroup(rule.id.clone())),
    };
    if let Some(id) = root.duplicate_id() {
        return Err(HarnessError::DuplicateId(id));
    }
    Ok(root)
}

/// Encode `root` as a pretty-printed tree document.
pub fn tree_document(root: &Arc<Group>) -> Result<String, HarnessError> {
    let node = Node::Group(Arc::clone(root));
    Ok(serde_json::to_string_pretty(&node)?)
}

/// Load the tree named by `path`, or the demo tree when there is none.
pub fn load_tree(path: Option<&Path>) -> Result<Group, HarnessError> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            let root = parse_tree(&json)?;
            tracing::info!(path = %path.display(), nodes = root.node_count(), "tree loaded");
            Ok(root)
        }
        None => Ok(demo_tree()),
    }
}
