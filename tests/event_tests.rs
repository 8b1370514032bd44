//! Event graph semantics through the engine surface.

use partwise::{Engine, EngineConfig, Error, EventId};

#[test]
fn merge_propagates_poison_regardless_of_order() {
    // Poison e1, trigger e2, then check the merge: triggered and poisoned.
    let engine = Engine::new(EngineConfig::default());
    let e1 = engine.create_user_event();
    let e2 = engine.create_user_event();
    let em = engine.merge_events(&[e1, e2]);

    assert!(!engine.events().has_triggered(em));
    engine.poison_event(e1);
    assert!(!engine.events().has_triggered(em));
    engine.trigger_event(e2);

    assert!(engine.events().has_triggered(em));
    assert!(engine.events().is_poisoned(em));
    assert!(matches!(engine.wait(em), Err(Error::PoisonedPrecondition)));
}

#[test]
fn merge_of_empty_set_is_triggered_and_clean() {
    let engine = Engine::new(EngineConfig::default());
    let em = engine.merge_events(&[]);
    assert!(engine.events().has_triggered(em));
    assert!(!engine.events().is_poisoned(em));
}

#[test]
fn merge_collapses_already_triggered_inputs() {
    let engine = Engine::new(EngineConfig::default());
    let e1 = engine.create_user_event();
    engine.trigger_event(e1);
    let em = engine.merge_events(&[e1, EventId::NONE]);
    assert!(engine.events().has_triggered(em));
    assert!(!engine.events().is_poisoned(em));
}

#[test]
fn triggering_is_monotonic() {
    let engine = Engine::new(EngineConfig::default());
    let e = engine.create_user_event();
    assert!(!engine.events().has_triggered(e));
    engine.trigger_event(e);
    // Once observed triggered, every later observation agrees.
    for _ in 0..100 {
        assert!(engine.events().has_triggered(e));
    }
    assert!(engine.wait(e).is_ok());
}

#[test]
fn no_event_sentinel_is_always_ready() {
    let engine = Engine::new(EngineConfig::default());
    assert!(engine.events().has_triggered(EventId::NONE));
    assert!(!engine.events().is_poisoned(EventId::NONE));
    assert!(engine.wait(EventId::NONE).is_ok());
}

#[test]
fn merge_chains_compose() {
    let engine = Engine::new(EngineConfig::default());
    let e1 = engine.create_user_event();
    let e2 = engine.create_user_event();
    let m1 = engine.merge_events(&[e1]);
    let m2 = engine.merge_events(&[m1, e2]);
    engine.trigger_event(e2);
    assert!(!engine.events().has_triggered(m2));
    engine.trigger_event(e1);
    assert!(engine.events().has_triggered(m1));
    assert!(engine.events().has_triggered(m2));
}
