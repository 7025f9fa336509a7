#![forbid(unsafe_code)]

//! Headless reference harness for rulekit.
//!
//! Loads a rule tree, replays a scripted drag through the drop-region
//! resolver, and prints the outline before, during, and after the drop.
//!
//! # Running
//!
//! ```sh
//! cargo run -p rulekit-harness
//! RULEKIT_HARNESS_TREE=tree.json RULEKIT_HARNESS_JSON=1 cargo run -p rulekit-harness
//! RULEKIT_LOG=rulekit_dnd=trace cargo run -p rulekit-harness
//! ```
//!
//! See [`rulekit_harness::config`] for every variable.

use std::cell::RefCell;
use std::rc::Rc;

use rulekit::RuleController;
use rulekit_harness::{
    HarnessConfig, HarnessError, TextLayout, load_tree, replay_first_to_last, tree_document,
};
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &HarnessConfig) {
    let filter = EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(rulekit_harness::config::DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_outline(title: &str, lines: &[String]) {
    println!("== {title} ==");
    for line in lines {
        println!("{line}");
    }
    println!();
}

fn main() -> Result<(), HarnessError> {
    let config = HarnessConfig::from_env();
    init_tracing(&config);
    tracing::debug!(?config, "harness starting");

    let root = load_tree(config.tree_path.as_deref())?;
    let controller = Rc::new(RefCell::new(RuleController::new(root)));
    let layout = TextLayout::new(config.row_height);

    print_outline("before", &layout.render(controller.borrow().root()));

    let report = replay_first_to_last(&controller, config.row_height)?;
    if !report.during.is_empty() {
        print_outline("dragging", &report.during);
    }

    let mut controller = controller.borrow_mut();
    print_outline("after", &layout.render(controller.root()));
    match (&report.dragged, &report.outcome) {
        (Some(rule), Some(outcome)) => println!("drag of {rule}: {outcome:?}"),
        _ => println!("no drag replayed"),
    }
    if let Some(state) = controller.drop_state() {
        println!(
            "dropped {} at {:?}",
            state.dropped_rule_id, state.avatar_bounds
        );
    }
    controller.flush_deferred();
    println!("undo available: {}", controller.can_undo());

    if config.print_json {
        println!("{}", tree_document(controller.root())?);
    }
    Ok(())
}
