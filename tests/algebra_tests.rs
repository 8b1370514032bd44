//! Deferred set algebra through the engine: unions, intersections,
//! differences, batch and scalar forms.

use partwise::{Engine, EngineConfig, EventId, IndexSpace, Point, Rect};

fn line(lo: i64, hi: i64) -> IndexSpace<1, i64> {
    Rect::new([lo], [hi]).into()
}

fn points_of(space: &IndexSpace<1, i64>) -> Vec<i64> {
    space.points().map(|p| p[0]).collect()
}

#[test]
fn union_of_disjoint_and_overlapping_spaces() {
    let engine = Engine::new(EngineConfig::default());
    let (u, done) = engine.compute_union(&[line(0, 9), line(5, 14), line(30, 31)], EventId::NONE);
    engine.wait(done).unwrap();
    assert_eq!(u.volume(), 17);
    assert!(u.contains(&Point::new([12])));
    assert!(!u.contains(&Point::new([20])));
}

#[test]
fn intersection_of_three_spaces() {
    let engine = Engine::new(EngineConfig::default());
    let (i, done) = engine.compute_intersection(
        &[line(0, 20), line(10, 30), line(15, 40)],
        EventId::NONE,
    );
    engine.wait(done).unwrap();
    assert_eq!(points_of(&i), (15..=20).collect::<Vec<_>>());
}

#[test]
fn difference_scalar_form() {
    let engine = Engine::new(EngineConfig::default());
    let (d, done) = engine.compute_difference(&line(0, 9), &line(3, 5), EventId::NONE);
    engine.wait(done).unwrap();
    assert_eq!(points_of(&d), vec![0, 1, 2, 6, 7, 8, 9]);
}

#[test]
fn pairwise_differences() {
    let engine = Engine::new(EngineConfig::default());
    let lhs = [line(0, 9), line(10, 19)];
    let rhs = [line(0, 4), line(15, 19)];
    let (outs, done) = engine.compute_differences(&lhs, &rhs, EventId::NONE);
    engine.wait(done).unwrap();
    assert_eq!(points_of(&outs[0]), (5..=9).collect::<Vec<_>>());
    assert_eq!(points_of(&outs[1]), (10..=14).collect::<Vec<_>>());
}

#[test]
fn broadcast_intersections_against_a_single_rhs() {
    let engine = Engine::new(EngineConfig::default());
    let lhs = [line(0, 9), line(5, 14), line(20, 29)];
    let shared = line(7, 24);
    let (outs, done) =
        engine.compute_intersections(&lhs, std::slice::from_ref(&shared), EventId::NONE);
    engine.wait(done).unwrap();
    assert_eq!(points_of(&outs[0]), vec![7, 8, 9]);
    assert_eq!(points_of(&outs[1]), (7..=14).collect::<Vec<_>>());
    assert_eq!(points_of(&outs[2]), (20..=24).collect::<Vec<_>>());
}

#[test]
fn mismatched_batch_lengths_poison_outputs() {
    let engine = Engine::new(EngineConfig::default());
    let lhs = [line(0, 9), line(10, 19), line(20, 29)];
    let rhs = [line(0, 4), line(15, 19)];
    let (outs, done) = engine.compute_differences(&lhs, &rhs, EventId::NONE);
    assert!(engine.wait(done).is_err());
    for out in &outs {
        assert!(engine.events().is_poisoned(out.validity_event()));
    }
}

#[test]
fn union_then_difference_round_trip() {
    // difference(union(a,b), b) ⊆ a, and intersect(a, difference(u, a)) = ∅.
    let engine = Engine::new(EngineConfig::default());
    let a = line(0, 49);
    let b = line(30, 79);

    let (u, e1) = engine.compute_union(&[a.clone(), b.clone()], EventId::NONE);
    let (d, e2) = engine.compute_difference(&u, &b, e1);
    let (leftover, e3) = engine.compute_difference(&u, &a, e1);
    let (clash, e4) = engine.compute_intersection(&[a.clone(), leftover.clone()], e3);
    engine.wait(engine.merge_events(&[e2, e4])).unwrap();

    for p in d.points() {
        assert!(a.contains(&p));
    }
    assert!(clash.is_empty());
    assert_eq!(u.volume(), 80);
    assert_eq!(leftover.volume(), 30);
}

#[test]
fn all_outputs_of_a_batch_become_valid_together() {
    let engine = Engine::new(EngineConfig::default());
    let gate = engine.create_user_event();
    let lhs = [line(0, 9), line(10, 19)];
    let rhs = [line(5, 9), line(10, 12)];
    let (outs, done) = engine.compute_intersections(&lhs, &rhs, gate);

    for out in &outs {
        assert!(!out.sparsity.as_ref().unwrap().is_valid());
    }
    engine.trigger_event(gate);
    engine.wait(done).unwrap();
    for out in &outs {
        assert!(out.sparsity.as_ref().unwrap().is_valid());
    }
    assert_eq!(points_of(&outs[0]), (5..=9).collect::<Vec<_>>());
    assert_eq!(points_of(&outs[1]), (10..=12).collect::<Vec<_>>());
}

#[test]
fn tighten_after_difference() {
    let engine = Engine::new(EngineConfig::default());
    let (d, done) = engine.compute_difference(&line(0, 99), &line(0, 89), EventId::NONE);
    engine.wait(done).unwrap();
    let t = d.tighten();
    assert_eq!(t.bounds, Rect::new([90], [99]));
    assert_eq!(t.volume(), 10);
    assert!(d.overlaps(&line(95, 200)));
    assert!(!d.overlaps(&line(0, 89)));
}
