#![forbid(unsafe_code)]

//! Log output of [`RuleController`] edits.
//!
//!   cargo test -p rulekit-tree --test tracing_tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rulekit_tree::{Group, GroupOperator, NodeId, Operator, Rule, RuleController};
use tracing_subscriber::layer::SubscriberExt;

// ============================================================================
// Test Infrastructure
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    fields: HashMap<String, String>,
}

/// A tracing Layer that records every event with its fields.
struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            fields: visitor.0.into_iter().collect(),
        });
    }
}

fn with_captured_events<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = EventCapture {
        events: Arc::clone(&events),
    };
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    captured
}

fn controller() -> RuleController {
    RuleController::new(
        Group::new("root", GroupOperator::Or).child(Rule::new("a", "Title", Operator::EQUALS, "x")),
    )
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn rejected_edit_logs_debug_event() {
    let events = with_captured_events(|| {
        let mut c = controller();
        let _ = c.remove_rule(&NodeId::from("missing"), &NodeId::from("root"));
    });

    let rejected: Vec<_> = events
        .iter()
        .filter(|e| e.fields.get("message").is_some_and(|m| m == "edit rejected"))
        .collect();
    assert_eq!(rejected.len(), 1, "events: {events:?}");
    assert_eq!(rejected[0].level, tracing::Level::DEBUG);
    assert_eq!(rejected[0].fields.get("op").map(String::as_str), Some("remove_rule"));
    assert!(
        rejected[0]
            .fields
            .get("err")
            .is_some_and(|e| e.contains("missing")),
        "error is rendered into the event"
    );
}

#[test]
fn committed_edit_logs_node_count() {
    let events = with_captured_events(|| {
        let mut c = controller();
        c.add_default_rule(&NodeId::from("root")).expect("add");
    });

    let committed = events
        .iter()
        .find(|e| e.fields.get("message").is_some_and(|m| m == "edit committed"))
        .expect("commit is logged");
    assert_eq!(committed.fields.get("op").map(String::as_str), Some("add_rule"));
    assert_eq!(committed.fields.get("nodes").map(String::as_str), Some("2"));
}

#[test]
fn no_op_edit_is_silent() {
    let events = with_captured_events(|| {
        let mut c = controller();
        c.set_group_operator(&NodeId::from("root"), GroupOperator::Or)
            .expect("same operator");
    });
    assert!(events.is_empty(), "events: {events:?}");
}
