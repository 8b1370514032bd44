//! Property-based invariants over the algebra and split kernels.

use std::collections::HashSet;

use proptest::prelude::*;

use partwise::{EventTable, IndexSpace, Rect, SparsityId, SparsityMap};
use partwise_space::algebra::{difference_entries, intersection_entries, union_entries};
use partwise_space::split::{split_cuts, split_space};

const THRESHOLD: usize = 64;

fn rect1() -> impl Strategy<Value = Rect<1, i64>> {
    (-50i64..50, 0i64..40).prop_map(|(lo, len)| Rect::new([lo], [lo + len]))
}

fn rect2() -> impl Strategy<Value = Rect<2, i64>> {
    (-20i64..20, 0i64..12, -20i64..20, 0i64..12)
        .prop_map(|(x, w, y, h)| Rect::new([x, y], [x + w, y + h]))
}

/// A canonical (disjoint-entry) sparse space built from arbitrary rects.
fn space1() -> impl Strategy<Value = IndexSpace<1, i64>> {
    (proptest::collection::vec(rect1(), 1..5), 0u64..1 << 32).prop_map(|(rects, salt)| {
        let inputs: Vec<IndexSpace<1, i64>> =
            rects.into_iter().map(IndexSpace::dense).collect();
        let entries = union_entries(&inputs, THRESHOLD);
        let bounds = inputs
            .iter()
            .fold(Rect::empty(), |acc, s| acc.bounding_union(&s.bounds));
        IndexSpace::sparse(bounds, SparsityMap::immediate(SparsityId::new(salt), entries))
    })
}

fn point_set(s: &IndexSpace<1, i64>) -> HashSet<i64> {
    s.points().map(|p| p[0]).collect()
}

fn materialize(bounds: Rect<1, i64>, entries: Vec<partwise::SparsityEntry<1, i64>>) -> IndexSpace<1, i64> {
    IndexSpace::sparse(bounds, SparsityMap::immediate(SparsityId::new(1), entries))
}

proptest! {
    #[test]
    fn rect_intersection_agrees_with_membership(a in rect2(), b in rect2()) {
        let i = a.intersection(&b);
        for p in a.points().take(512) {
            prop_assert_eq!(i.contains_point(&p), b.contains_point(&p));
        }
        prop_assert!(i.volume() <= a.volume().min(b.volume()));
    }

    #[test]
    fn rect_subtract_is_a_disjoint_cover(a in rect2(), b in rect2()) {
        let parts = a.subtract(&b);
        prop_assert!(parts.len() <= 4);
        let cut = a.intersection(&b);
        let total: u64 = parts.iter().map(|r| r.volume()).sum();
        prop_assert_eq!(total, a.volume() - cut.volume());
        for (i, x) in parts.iter().enumerate() {
            prop_assert!(!x.overlaps(&b));
            prop_assert!(a.contains_rect(x));
            for y in &parts[i + 1..] {
                prop_assert!(!x.overlaps(y));
            }
        }
    }

    #[test]
    fn union_covers_both_operands(a in space1(), b in space1()) {
        let bounds = a.bounds.bounding_union(&b.bounds);
        let u = materialize(bounds, union_entries(&[a.clone(), b.clone()], THRESHOLD));
        let expect: HashSet<i64> = point_set(&a).union(&point_set(&b)).cloned().collect();
        prop_assert_eq!(point_set(&u), expect);
    }

    #[test]
    fn intersection_is_the_common_points(a in space1(), b in space1()) {
        let bounds = a.bounds.intersection(&b.bounds);
        let i = materialize(bounds, intersection_entries(&a, &b, THRESHOLD));
        let expect: HashSet<i64> =
            point_set(&a).intersection(&point_set(&b)).cloned().collect();
        prop_assert_eq!(point_set(&i), expect);
    }

    #[test]
    fn difference_round_trip(a in space1(), b in space1()) {
        let bounds = a.bounds.bounding_union(&b.bounds);
        let u = materialize(bounds, union_entries(&[a.clone(), b.clone()], THRESHOLD));
        // difference(union(a,b), b) ⊆ a
        let d = materialize(bounds, difference_entries(&u, &b, THRESHOLD));
        for p in d.points() {
            prop_assert!(a.contains(&p));
        }
        // intersect(a, difference(u, a)) = ∅
        let rest = materialize(bounds, difference_entries(&u, &a, THRESHOLD));
        prop_assert!(intersection_entries(&a, &rest, THRESHOLD).is_empty());
    }

    #[test]
    fn equal_split_volumes_are_balanced(
        space in space1(),
        n in 1usize..6,
        g in 1u64..4,
    ) {
        let total = space.volume();
        let cuts = split_cuts(total, g, &vec![1; n]).unwrap();
        let slices = split_space(&space, &cuts);
        let vols: Vec<u64> = slices
            .iter()
            .map(|s| s.iter().map(|r| r.volume()).sum())
            .collect();
        prop_assert_eq!(vols.iter().sum::<u64>(), total);
        let max = *vols.iter().max().unwrap();
        let min = *vols.iter().min().unwrap();
        prop_assert!(max - min <= g);
    }

    #[test]
    fn weighted_split_tracks_the_weights(
        space in space1(),
        weights in proptest::collection::vec(0u64..8, 1..5),
    ) {
        prop_assume!(weights.iter().sum::<u64>() > 0);
        let total = space.volume();
        let cuts = split_cuts(total, 1, &weights).unwrap();
        let slices = split_space(&space, &cuts);
        let w_total: u64 = weights.iter().sum();
        for (i, s) in slices.iter().enumerate() {
            let vol: u64 = s.iter().map(|r| r.volume()).sum();
            let ideal = total as f64 * weights[i] as f64 / w_total as f64;
            prop_assert!((vol as f64 - ideal).abs() < 2.0);
        }
    }

    #[test]
    fn split_slices_are_disjoint_and_ordered(space in space1(), n in 1usize..5) {
        let total = space.volume();
        let cuts = split_cuts(total, 1, &vec![1; n]).unwrap();
        let slices = split_space(&space, &cuts);
        let mut seen = HashSet::new();
        let mut last_slice_max = i64::MIN;
        for s in &slices {
            let mut slice_min = i64::MAX;
            let mut slice_max = i64::MIN;
            for r in s {
                for p in r.points() {
                    prop_assert!(seen.insert(p[0]));
                    slice_min = slice_min.min(p[0]);
                    slice_max = slice_max.max(p[0]);
                }
            }
            if slice_min <= slice_max {
                // Lex slicing: each slice sits entirely after the previous.
                prop_assert!(slice_min > last_slice_max);
                last_slice_max = slice_max;
            }
        }
        prop_assert_eq!(seen.len() as u64, total);
    }

    #[test]
    fn merged_events_poison_iff_any_input_was(poisons in proptest::collection::vec(any::<bool>(), 0..6)) {
        let table = EventTable::new(0);
        let inputs: Vec<_> = poisons.iter().map(|_| table.create_event()).collect();
        let merged = table.merge(&inputs);
        for (e, &p) in inputs.iter().zip(&poisons) {
            if p {
                table.trigger_poisoned(*e);
            } else {
                table.trigger(*e);
            }
        }
        prop_assert!(table.has_triggered(merged));
        prop_assert_eq!(table.is_poisoned(merged), poisons.iter().any(|&p| p));
    }
}
