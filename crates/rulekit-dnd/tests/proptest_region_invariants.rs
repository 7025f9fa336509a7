//! Property-based invariant tests for drop region construction.
//!
//! 1. Every leaf contributes exactly two regions, `Before` then `After`.
//! 2. A leaf's two regions tile its bounds.
//! 3. Any point inside some leaf hits a region, and the hit belongs to that
//!    leaf or to an earlier one sharing the point.

use proptest::prelude::*;
use rulekit_core::geometry::{Position, Rect};
use rulekit_dnd::{LeafPosition, compute_regions, hit_test};
use rulekit_tree::{NodeId, Relation};

fn leaves_strategy() -> impl Strategy<Value = Vec<LeafPosition>> {
    prop::collection::vec((0u16..=100, 0u16..=100, 1u16..=40, 1u16..=10), 0..12).prop_map(
        |rects| {
            rects
                .into_iter()
                .enumerate()
                .map(|(i, (x, y, w, h))| LeafPosition {
                    id: NodeId::from(format!("leaf-{i}")),
                    containing_group_id: NodeId::from(format!("group-{}", i % 3)),
                    bounds: Rect::new(x, y, w, h),
                })
                .collect()
        },
    )
}

proptest! {
    #[test]
    fn two_regions_per_leaf(leaves in leaves_strategy()) {
        let regions = compute_regions(&leaves);
        prop_assert_eq!(regions.len(), leaves.len() * 2);
        for (leaf, pair) in leaves.iter().zip(regions.chunks(2)) {
            prop_assert_eq!(&pair[0].anchor_id, &leaf.id);
            prop_assert_eq!(&pair[1].anchor_id, &leaf.id);
            prop_assert_eq!(&pair[0].target_group_id, &leaf.containing_group_id);
            prop_assert_eq!(pair[0].relation, Relation::Before);
            prop_assert_eq!(pair[1].relation, Relation::After);
            prop_assert_eq!(pair[0].bounds.y, leaf.bounds.y);
            prop_assert_eq!(pair[0].bounds.bottom(), pair[1].bounds.y);
            prop_assert_eq!(pair[1].bounds.bottom(), leaf.bounds.bottom());
        }
    }
}

proptest! {
    #[test]
    fn points_in_leaves_always_hit(
        leaves in leaves_strategy(),
        pick in any::<prop::sample::Index>(),
        fx in 0.0f64..=1.0,
        fy in 0.0f64..=1.0,
    ) {
        prop_assume!(!leaves.is_empty());
        let leaf_index = pick.index(leaves.len());
        let bounds = leaves[leaf_index].bounds;
        let pointer = Position::new(
            bounds.x + (f64::from(bounds.width) * fx) as u16,
            bounds.y + (f64::from(bounds.height) * fy) as u16,
        );
        let regions = compute_regions(&leaves);
        let hit = hit_test(&regions, pointer).expect("point inside a leaf");
        prop_assert!(hit / 2 <= leaf_index);
        prop_assert!(regions[hit].bounds.contains_inclusive(pointer));
    }
}
