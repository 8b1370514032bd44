//! Equal and weighted splits, end to end through the deferred engine.

use partwise::{Engine, EngineConfig, EventId, IndexSpace, PartitionableSpace, Point, Rect};

fn volumes(spaces: &[IndexSpace<1, i64>]) -> Vec<u64> {
    spaces.iter().map(|s| s.volume()).collect()
}

#[test]
fn equal_split_of_a_hundred_into_four() {
    let engine = Engine::new(EngineConfig::default());
    let parent: IndexSpace<1, i64> = Rect::new([0], [99]).into();

    let (outs, done) = parent.create_equal_subspaces(&engine, 4, 1, EventId::NONE);
    engine.wait(done).unwrap();

    assert_eq!(volumes(&outs), vec![25, 25, 25, 25]);
    let expected = [(0, 24), (25, 49), (50, 74), (75, 99)];
    for (out, (lo, hi)) in outs.iter().zip(expected) {
        for x in lo..=hi {
            assert!(out.contains(&Point::new([x])), "{x} missing");
        }
        assert!(!out.contains(&Point::new([hi + 1])) || hi == 99);
    }
}

#[test]
fn weighted_split_of_ten_by_one_two_one() {
    let engine = Engine::new(EngineConfig::default());
    let parent: IndexSpace<1, i64> = Rect::new([0], [9]).into();

    let (outs, done) = parent.create_weighted_subspaces(&engine, 1, &[1, 2, 1], EventId::NONE);
    engine.wait(done).unwrap();

    assert_eq!(volumes(&outs), vec![2, 5, 3]);
    let expected = [(0i64, 1i64), (2, 6), (7, 9)];
    for (out, (lo, hi)) in outs.iter().zip(expected) {
        for x in lo..=hi {
            assert!(out.contains(&Point::new([x])));
        }
    }
}

#[test]
fn split_outputs_partition_the_parent() {
    let engine = Engine::new(EngineConfig::default());
    let parent: IndexSpace<1, i64> = Rect::new([0], [76]).into();

    let (outs, done) = parent.create_equal_subspaces(&engine, 5, 1, EventId::NONE);
    engine.wait(done).unwrap();

    // Pairwise disjoint, union is the parent.
    let total: u64 = volumes(&outs).iter().sum();
    assert_eq!(total, parent.volume());
    for x in 0..=76i64 {
        let hits = outs
            .iter()
            .filter(|o| o.contains(&Point::new([x])))
            .count();
        assert_eq!(hits, 1, "point {x} covered {hits} times");
    }
    // Equal split: sizes within one granularity unit of each other.
    let vs = volumes(&outs);
    assert!(vs.iter().max().unwrap() - vs.iter().min().unwrap() <= 1);
}

#[test]
fn two_dim_equal_split_slices_in_scan_order() {
    let engine = Engine::new(EngineConfig::default());
    let parent: IndexSpace<2, i64> = Rect::new([0, 0], [7, 7]).into();

    let (outs, done) = engine.create_equal_subspaces(&parent, 4, 1, EventId::NONE);
    engine.wait(done).unwrap();

    for out in &outs {
        assert_eq!(out.volume(), 16);
    }
    // Dimension 0 varies fastest, so piece 0 is the bottom two rows.
    assert!(outs[0].contains(&Point::new([7, 1])));
    assert!(!outs[0].contains(&Point::new([0, 2])));
    assert!(outs[3].contains(&Point::new([0, 6])));
}

#[test]
fn split_of_a_sparse_space_balances_points() {
    let engine = Engine::new(EngineConfig::default());
    let parent: IndexSpace<1, i64> = Rect::new([0], [999]).into();

    // Carve a sparse subset first, then split it evenly.
    let holes: IndexSpace<1, i64> = Rect::new([100], [899]).into();
    let (sparse, d1) = engine.compute_difference(&parent, &holes, EventId::NONE);
    let (outs, d2) = engine.create_equal_subspaces(&sparse, 2, 1, d1);
    engine.wait(d2).unwrap();

    assert_eq!(sparse.volume(), 200);
    assert_eq!(volumes(&outs), vec![100, 100]);
    assert!(outs[0].contains(&Point::new([0])));
    assert!(outs[1].contains(&Point::new([999])));
}

#[test]
fn weighted_split_with_zero_weight_gives_empty_piece() {
    let engine = Engine::new(EngineConfig::default());
    let parent: IndexSpace<1, i64> = Rect::new([0], [9]).into();

    let (outs, done) = engine.create_weighted_subspaces(&parent, 1, &[1, 0, 1], EventId::NONE);
    engine.wait(done).unwrap();

    assert_eq!(volumes(&outs), vec![5, 0, 5]);
    assert!(outs[1].is_empty());
}

#[test]
fn weights_summing_to_zero_poison_the_outputs() {
    let engine = Engine::new(EngineConfig::default());
    let parent: IndexSpace<1, i64> = Rect::new([0], [9]).into();

    let (outs, done) = engine.create_weighted_subspaces(&parent, 1, &[0, 0], EventId::NONE);
    assert!(engine.wait(done).is_err());
    for out in &outs {
        assert!(engine.events().is_poisoned(out.validity_event()));
    }
}
