//! The operator scheduler: waiter registration, ready queue, worker pool.
//!
//! Lifecycle of a request:
//!
//! ```text
//! Created --(precondition triggers)--> Ready
//! Ready   --(worker picks)-----------> Running
//! Running --(outputs written)--------> Finalizing
//! Finalizing --(validity triggered)--> Completing
//! Completing --(completion trigger)--> Done
//! ```
//!
//! Shutdown moves every non-Done request to Cancelled, which still triggers
//! its output and completion events, poisoned.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use partwise_core::config::EngineConfig;
use partwise_core::digest::Digest;
use partwise_core::id::{IdGen, OpId, WaiterId};
use partwise_event::{EventId, EventSink, EventTable};
use partwise_field::HeapInstances;
use partwise_ops::{OpContext, PartitionOperator};

use crate::dedup::DedupCache;
use crate::metrics::{trace_state, SchedulerStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum OpState {
    Created = 0,
    Ready,
    Running,
    Finalizing,
    Completing,
    Done,
    Cancelled,
}

impl OpState {
    fn name(self) -> &'static str {
        match self {
            OpState::Created => "created",
            OpState::Ready => "ready",
            OpState::Running => "running",
            OpState::Finalizing => "finalizing",
            OpState::Completing => "completing",
            OpState::Done => "done",
            OpState::Cancelled => "cancelled",
        }
    }
}

struct QueuedOp {
    id: OpId,
    op: Box<dyn PartitionOperator>,
    completion: EventId,
    state: AtomicU8,
    digest: Option<Digest>,
}

impl QueuedOp {
    fn set_state(&self, state: OpState) {
        self.state.store(state as u8, Ordering::Release);
        trace_state(self.id, self.op.name(), state.name());
    }
}

enum WorkItem {
    Run { waiter: WaiterId, poisoned: bool },
    Stop,
}

pub(crate) struct SchedulerShared {
    config: EngineConfig,
    events: Arc<EventTable>,
    instances: Arc<HeapInstances>,
    sparsity_ids: Arc<IdGen>,
    waiting: Mutex<HashMap<WaiterId, Arc<QueuedOp>>>,
    tx: Sender<WorkItem>,
    waiter_ids: IdGen,
    op_ids: IdGen,
    shutting_down: AtomicBool,
    pub(crate) dedup: DedupCache,
    pub(crate) stats: SchedulerStats,
}

impl SchedulerShared {
    fn context(&self) -> OpContext<'_> {
        OpContext::new(
            &self.events,
            self.instances.as_ref(),
            &self.config,
            &self.sparsity_ids,
        )
    }

    /// Poison an operator's outputs and completion without running it. The
    /// dedup entry goes first: once the completion is observable, the request
    /// must no longer be joinable.
    fn cancel(&self, qop: &QueuedOp, state: OpState) {
        if let Some(d) = &qop.digest {
            self.dedup.evict(d);
        }
        qop.op.poison_outputs(&self.context());
        self.events.trigger_poisoned(qop.completion);
        qop.set_state(state);
    }
}

/// Work waiters woken by the event table flow straight onto the ready queue.
impl EventSink for SchedulerShared {
    fn wake(&self, waiters: Vec<WaiterId>, poisoned: bool) {
        for waiter in waiters {
            let _ = self.tx.send(WorkItem::Run { waiter, poisoned });
        }
    }
}

pub struct Scheduler {
    shared: Arc<SchedulerShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Build the scheduler and spawn its workers. The returned shared state
    /// must also be registered as the event table's sink.
    pub(crate) fn start(
        config: EngineConfig,
        events: Arc<EventTable>,
        instances: Arc<HeapInstances>,
        sparsity_ids: Arc<IdGen>,
    ) -> (Scheduler, Arc<SchedulerShared>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let shared = Arc::new(SchedulerShared {
            config: config.clone(),
            events,
            instances,
            sparsity_ids,
            waiting: Mutex::new(HashMap::new()),
            tx,
            waiter_ids: IdGen::new(),
            op_ids: IdGen::new(),
            shutting_down: AtomicBool::new(false),
            dedup: DedupCache::default(),
            stats: SchedulerStats::default(),
        });

        let mut workers = Vec::with_capacity(config.worker_threads.max(1));
        for i in 0..config.worker_threads.max(1) {
            let shared = Arc::clone(&shared);
            let rx = rx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("partwise-worker-{i}"))
                .spawn(move || worker_loop(shared, rx))
                .expect("failed to spawn worker thread");
            workers.push(handle);
        }

        (
            Scheduler {
                shared: Arc::clone(&shared),
                workers: Mutex::new(workers),
            },
            shared,
        )
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.shared.shutting_down.load(Ordering::Acquire)
    }

    pub(crate) fn dedup(&self) -> &DedupCache {
        &self.shared.dedup
    }

    pub(crate) fn stats(&self) -> &SchedulerStats {
        &self.shared.stats
    }

    /// Queue an operator behind its precondition. The completion event is
    /// triggered (cleanly or poisoned) exactly once, later.
    pub(crate) fn submit(
        &self,
        op: Box<dyn PartitionOperator>,
        precondition: EventId,
        completion: EventId,
        digest: Option<Digest>,
    ) {
        let shared = &self.shared;
        SchedulerStats::bump(&shared.stats.submitted);

        let qop = Arc::new(QueuedOp {
            id: OpId::new(shared.op_ids.next_raw()),
            op,
            completion,
            state: AtomicU8::new(OpState::Created as u8),
            digest,
        });

        if self.is_shutting_down() {
            SchedulerStats::bump(&shared.stats.cancelled);
            shared.cancel(&qop, OpState::Cancelled);
            return;
        }

        let waiter = WaiterId::new(shared.waiter_ids.next_raw());
        shared.waiting.lock().insert(waiter, Arc::clone(&qop));

        // If the precondition already triggered, the registration tells us to
        // schedule the work item ourselves.
        if let Some(poisoned) = shared.events.add_waiter(precondition, waiter) {
            let _ = shared.tx.send(WorkItem::Run { waiter, poisoned });
        }
    }

    /// Stop dequeuing, poison every pending operator, and drain the workers.
    pub(crate) fn shutdown(&self) {
        let shared = &self.shared;
        if shared
            .shutting_down
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let pending: Vec<Arc<QueuedOp>> = shared.waiting.lock().drain().map(|(_, q)| q).collect();
        for qop in pending {
            SchedulerStats::bump(&shared.stats.cancelled);
            shared.cancel(&qop, OpState::Cancelled);
        }

        let mut workers = self.workers.lock();
        for _ in workers.iter() {
            let _ = shared.tx.send(WorkItem::Stop);
        }
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(shared: Arc<SchedulerShared>, rx: Receiver<WorkItem>) {
    while let Ok(item) = rx.recv() {
        let (waiter, poisoned) = match item {
            WorkItem::Stop => break,
            WorkItem::Run { waiter, poisoned } => (waiter, poisoned),
        };
        // Shutdown may have drained this waiter already.
        let Some(qop) = shared.waiting.lock().remove(&waiter) else {
            continue;
        };
        if shared.shutting_down.load(Ordering::Acquire) {
            SchedulerStats::bump(&shared.stats.cancelled);
            shared.cancel(&qop, OpState::Cancelled);
            continue;
        }
        qop.set_state(OpState::Ready);

        if poisoned {
            // Poisoned precondition: no algorithm runs.
            SchedulerStats::bump(&shared.stats.poisoned);
            shared.cancel(&qop, OpState::Done);
            continue;
        }

        qop.set_state(OpState::Running);
        let cx = shared.context();
        match qop.op.execute(&cx) {
            Ok(()) => {
                // Outputs written and validity events triggered inside
                // execute; announce our own completion afterwards. Evict the
                // dedup entry first so a completed request is never joined.
                qop.set_state(OpState::Finalizing);
                if let Some(d) = &qop.digest {
                    shared.dedup.evict(d);
                }
                qop.set_state(OpState::Completing);
                shared.events.trigger(qop.completion);
                qop.set_state(OpState::Done);
                SchedulerStats::bump(&shared.stats.completed);
            }
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(op = %qop.id, error = %_err, "operator failed");
                SchedulerStats::bump(&shared.stats.poisoned);
                shared.cancel(&qop, OpState::Done);
            }
        }
    }
}
