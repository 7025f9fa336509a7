//! Scripted drag replay.
//!
//! Picks up the first leaf in document order and releases it just below the
//! last one, the same sequence of inputs a pointer-driven host would feed.

use std::cell::RefCell;
use std::rc::Rc;

use rulekit::{
    DragAvatar, DragDispatch, DragInput, DragManager, DragPayload, DropRegionResolver, NodeId,
    Position, Rect, RuleController, RuleDragData, SessionOutcome, SharedListener, ViewAdapter,
};

use crate::layout::TextLayout;

/// What a replay did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    /// The rule that was picked up, if the tree had enough leaves to drag.
    pub dragged: Option<NodeId>,
    pub outcome: Option<SessionOutcome>,
    /// Outline captured while hovering over the drop target.
    pub during: Vec<String>,
}

impl ReplayReport {
    fn skipped() -> Self {
        Self {
            dragged: None,
            outcome: None,
            during: Vec::new(),
        }
    }
}

struct TextAvatar {
    origin: Rect,
    offset: (i32, i32),
    visible: bool,
}

impl DragAvatar for TextAvatar {
    fn show(&mut self) {
        self.visible = true;
    }

    fn set_offset(&mut self, dx: i32, dy: i32) {
        self.offset = (dx, dy);
    }

    fn bounds(&self) -> Option<Rect> {
        self.visible
            .then(|| self.origin.translated(self.offset.0, self.offset.1))
    }

    fn remove(&mut self) {
        self.visible = false;
    }
}

/// Drag the first leaf to just after the last leaf.
///
/// Trees with fewer than two leaves are left alone.
pub fn replay_first_to_last(
    controller: &Rc<RefCell<RuleController>>,
    row_height: u16,
) -> rulekit::Result<ReplayReport> {
    let layout = TextLayout::new(row_height);
    let leaves = layout.list_leaf_positions(controller.borrow().root());
    if leaves.len() < 2 {
        tracing::info!("fewer than two rules; nothing to drag");
        return Ok(ReplayReport::skipped());
    }
    let (Some(first), Some(last)) = (leaves.first(), leaves.last()) else {
        return Ok(ReplayReport::skipped());
    };
    let Some(data) = RuleDragData::locate(controller.borrow().root(), &first.id) else {
        return Ok(ReplayReport::skipped());
    };

    let resolver = Rc::new(RefCell::new(DropRegionResolver::new(
        Rc::clone(controller),
        layout,
    )));
    let listener: SharedListener = resolver.clone();
    let mut manager = DragManager::default();
    manager.register_listener(listener);

    let origin = first.bounds;
    let start = Position::new(origin.x, origin.y);
    // The bottom edge of the last leaf only falls inside its `After` half.
    let target = Position::new(last.bounds.x, last.bounds.bottom());

    manager.begin_session(data.into_payload(), start, |_: &DragPayload| -> Box<dyn DragAvatar> {
        Box::new(TextAvatar {
            origin,
            offset: (0, 0),
            visible: false,
        })
    })?;
    tracing::info!(rule = %first.id, x = target.x, y = target.y, "replaying drag");

    manager.handle_input(DragInput::PointerMove(target));
    let during = resolver
        .borrow()
        .adapter()
        .render(controller.borrow().root());

    let outcome = match manager.handle_input(DragInput::PointerUp(target)) {
        DragDispatch::Finished(outcome) => Some(outcome),
        DragDispatch::Ignored | DragDispatch::Hovered { .. } => None,
    };
    tracing::info!(?outcome, "replay finished");

    Ok(ReplayReport {
        dragged: Some(first.id.clone()),
        outcome,
        during,
    })
}
