//! The event arena: id allocation, triggering, waiter lists, merge.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex, RwLock};
use serde::{Deserialize, Serialize};

use partwise_core::error::{Error, Result};
use partwise_core::id::{IdGen, WaiterId};

use crate::sink::EventSink;

const GEN_BITS: u32 = 40;
const GEN_MASK: u64 = (1 << GEN_BITS) - 1;

/// A one-shot event name: creator node in the high 24 bits, generation in the
/// low 40. `EventId::NONE` (all zeroes) is the sentinel that is always
/// triggered and never poisoned.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u64);

impl EventId {
    pub const NONE: EventId = EventId(0);

    fn new(node: u32, generation: u64) -> Self {
        debug_assert!(generation != 0 && generation <= GEN_MASK);
        EventId(((node as u64) << GEN_BITS) | generation)
    }

    pub fn exists(&self) -> bool {
        self.0 != 0
    }

    pub fn creator_node(&self) -> u32 {
        (self.0 >> GEN_BITS) as u32
    }

    pub fn generation(&self) -> u64 {
        self.0 & GEN_MASK
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{:x}", self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{:x}", self.0)
    }
}

enum Waiter {
    Work(WaiterId),
    Merge(Arc<MergeCore>),
}

/// Countdown continuation for `merge`: triggers `target` once every input has
/// triggered, poisoned iff any input was.
struct MergeCore {
    target: EventId,
    remaining: AtomicUsize,
    poisoned: AtomicBool,
}

#[derive(Default)]
struct SlotState {
    triggered: bool,
    poisoned: bool,
    waiters: Vec<Waiter>,
}

struct EventSlot {
    state: Mutex<SlotState>,
}

/// The per-engine event arena.
///
/// Slots are created by `create_event` and live for the engine's lifetime.
/// The sink (registered once by the scheduler) receives woken work waiters;
/// merge continuations are internal.
pub struct EventTable {
    node_id: u32,
    generations: IdGen,
    slots: RwLock<HashMap<u64, Arc<EventSlot>>>,
    // Held weakly: the sink (the scheduler) holds this table strongly, and a
    // strong reference back would leak the pair.
    sink: RwLock<Option<Weak<dyn EventSink>>>,
    wait_lock: Mutex<()>,
    wait_cv: Condvar,
}

impl EventTable {
    pub fn new(node_id: u32) -> Self {
        Self {
            node_id,
            generations: IdGen::new(),
            slots: RwLock::new(HashMap::new()),
            sink: RwLock::new(None),
            wait_lock: Mutex::new(()),
            wait_cv: Condvar::new(),
        }
    }

    /// Register the work-waiter sink. Called once at engine construction.
    pub fn set_sink(&self, sink: Arc<dyn EventSink>) {
        let mut slot = self.sink.write();
        assert!(slot.is_none(), "event sink registered twice");
        *slot = Some(Arc::downgrade(&sink));
    }

    /// Allocate a fresh untriggered event.
    pub fn create_event(&self) -> EventId {
        self.alloc(false, false)
    }

    fn alloc(&self, triggered: bool, poisoned: bool) -> EventId {
        let generation = self.generations.next_raw();
        assert!(generation <= GEN_MASK, "event generations exhausted");
        let id = EventId::new(self.node_id, generation);
        let slot = Arc::new(EventSlot {
            state: Mutex::new(SlotState {
                triggered,
                poisoned,
                waiters: Vec::new(),
            }),
        });
        self.slots.write().insert(id.raw(), slot);
        id
    }

    fn slot(&self, id: EventId) -> Arc<EventSlot> {
        self.slots
            .read()
            .get(&id.raw())
            .cloned()
            .unwrap_or_else(|| panic!("unknown event id {id}"))
    }

    /// Trigger cleanly. Triggering an event twice is a programming error.
    pub fn trigger(&self, id: EventId) {
        self.fire(id, false);
    }

    /// Set the poisoned flag and trigger.
    pub fn trigger_poisoned(&self, id: EventId) {
        self.fire(id, true);
    }

    fn fire(&self, id: EventId, poisoned: bool) {
        assert!(id.exists(), "cannot trigger the no-event sentinel");
        let slot = self.slot(id);
        let waiters = {
            let mut st = slot.state.lock();
            assert!(!st.triggered, "event {id} triggered twice");
            st.triggered = true;
            st.poisoned = poisoned;
            std::mem::take(&mut st.waiters)
        };

        let mut work = Vec::new();
        for w in waiters {
            match w {
                Waiter::Work(wid) => work.push(wid),
                Waiter::Merge(core) => self.merge_input_done(core, poisoned),
            }
        }
        if !work.is_empty() {
            let sink = self.sink.read().as_ref().and_then(Weak::upgrade);
            match sink {
                Some(sink) => sink.wake(work, poisoned),
                // Sink already torn down: the work items' owner is gone too.
                None => {}
            }
        }

        let _g = self.wait_lock.lock();
        self.wait_cv.notify_all();
    }

    fn merge_input_done(&self, core: Arc<MergeCore>, poisoned: bool) {
        if poisoned {
            core.poisoned.store(true, Ordering::Release);
        }
        if core.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.fire(core.target, core.poisoned.load(Ordering::Acquire));
        }
    }

    pub fn has_triggered(&self, id: EventId) -> bool {
        if !id.exists() {
            return true;
        }
        self.slot(id).state.lock().triggered
    }

    pub fn is_poisoned(&self, id: EventId) -> bool {
        if !id.exists() {
            return false;
        }
        self.slot(id).state.lock().poisoned
    }

    /// Register a work waiter. Returns `None` if the waiter was deferred, or
    /// `Some(poisoned)` if the event has already triggered, in which case the
    /// caller must schedule the work item itself.
    pub fn add_waiter(&self, id: EventId, waiter: WaiterId) -> Option<bool> {
        if !id.exists() {
            return Some(false);
        }
        let slot = self.slot(id);
        let mut st = slot.state.lock();
        if st.triggered {
            Some(st.poisoned)
        } else {
            st.waiters.push(Waiter::Work(waiter));
            None
        }
    }

    /// An event that triggers exactly when all inputs have triggered,
    /// poisoned iff any input was. An empty input set yields an
    /// already-triggered, unpoisoned event.
    pub fn merge(&self, inputs: &[EventId]) -> EventId {
        let out = self.alloc(false, false);
        let core = Arc::new(MergeCore {
            target: out,
            remaining: AtomicUsize::new(inputs.len().max(1)),
            poisoned: AtomicBool::new(false),
        });

        if inputs.is_empty() {
            self.merge_input_done(core, false);
            return out;
        }

        for &input in inputs {
            if !input.exists() {
                self.merge_input_done(Arc::clone(&core), false);
                continue;
            }
            let slot = self.slot(input);
            let already = {
                let mut st = slot.state.lock();
                if st.triggered {
                    Some(st.poisoned)
                } else {
                    st.waiters.push(Waiter::Merge(Arc::clone(&core)));
                    None
                }
            };
            if let Some(poisoned) = already {
                self.merge_input_done(Arc::clone(&core), poisoned);
            }
        }
        out
    }

    /// Block until the event triggers. For top-level code only; operators
    /// never call this. A poisoned event surfaces as an error.
    pub fn wait(&self, id: EventId) -> Result<()> {
        if id.exists() {
            let mut g = self.wait_lock.lock();
            while !self.has_triggered(id) {
                self.wait_cv.wait(&mut g);
            }
        }
        if self.is_poisoned(id) {
            Err(Error::PoisonedPrecondition)
        } else {
            Ok(())
        }
    }
}
