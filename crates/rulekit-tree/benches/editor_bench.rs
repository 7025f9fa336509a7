//! Benchmarks for copy-on-write tree edits.
//!
//! Run with: cargo bench -p rulekit-tree

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rulekit_tree::edit::{self, Anchor};
use rulekit_tree::{Group, GroupOperator, NodeId, Operator, Rule};
use std::hint::black_box;
use std::sync::Arc;

fn leaf(id: String) -> Rule {
    Rule::new(id, "Title", Operator::EQUALS, "x")
}

/// One root with `groups` subgroups of `per_group` rules each.
fn wide_tree(groups: usize, per_group: usize) -> Arc<Group> {
    let mut root = Group::new("root", GroupOperator::Or);
    for g in 0..groups {
        let mut group = Group::new(format!("g{g}"), GroupOperator::And);
        for r in 0..per_group {
            group = group.child(leaf(format!("g{g}-r{r}")));
        }
        root = root.child(group);
    }
    Arc::new(root)
}

/// A chain of nested groups, each holding one rule plus the next level.
fn deep_tree(depth: usize) -> Arc<Group> {
    let mut current = Group::new(format!("d{depth}"), GroupOperator::And)
        .child(leaf(format!("r{depth}")));
    for level in (0..depth).rev() {
        current = Group::new(format!("d{level}"), GroupOperator::And)
            .child(leaf(format!("r{level}")))
            .child(current);
    }
    Arc::new(current)
}

// ============================================================================
// Wide trees
// ============================================================================

fn bench_wide(c: &mut Criterion) {
    let mut group = c.benchmark_group("editor/wide");

    for (groups, per_group) in [(10, 10), (50, 50), (200, 50)] {
        let root = wide_tree(groups, per_group);
        let label = format!("{groups}x{per_group}");
        let last = NodeId::from(format!("g{}", groups - 1));
        let first = NodeId::from("g0");

        group.bench_with_input(BenchmarkId::new("add_rule", &label), &(), |b, _| {
            b.iter(|| {
                let out = edit::add_rule(&root, leaf("new".to_string()).into(), &last);
                black_box(out)
            })
        });

        group.bench_with_input(BenchmarkId::new("move_rule", &label), &(), |b, _| {
            let rule_id = NodeId::from("g0-r0");
            b.iter(|| {
                let out = edit::move_rule(
                    &root,
                    &rule_id,
                    &first,
                    &last,
                    Some(Anchor::before(format!("g{}-r0", groups - 1))),
                );
                black_box(out)
            })
        });

        group.bench_with_input(BenchmarkId::new("set_operator", &label), &(), |b, _| {
            b.iter(|| black_box(edit::set_group_operator(&root, &last, GroupOperator::Or)))
        });
    }

    group.finish();
}

// ============================================================================
// Deep trees
// ============================================================================

fn bench_deep(c: &mut Criterion) {
    let mut group = c.benchmark_group("editor/deep");

    for depth in [100, 1_000, 10_000] {
        let root = deep_tree(depth);
        let bottom = NodeId::from(format!("d{depth}"));
        let top = NodeId::from("d0");

        group.bench_with_input(BenchmarkId::new("add_rule", depth), &(), |b, _| {
            b.iter(|| black_box(edit::add_rule(&root, leaf("new".to_string()).into(), &bottom)))
        });

        group.bench_with_input(BenchmarkId::new("move_to_root", depth), &(), |b, _| {
            let rule_id = NodeId::from(format!("r{depth}"));
            b.iter(|| black_box(edit::move_rule(&root, &rule_id, &bottom, &top, None)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_wide, bench_deep);
criterion_main!(benches);
