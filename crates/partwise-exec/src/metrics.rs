//! Scheduler counters and feature-gated tracing hooks.
//!
//! The counters are advisory (Relaxed loads); wire them to a real telemetry
//! stack in the binary layer if needed.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct SchedulerStats {
    pub(crate) submitted: AtomicU64,
    pub(crate) completed: AtomicU64,
    pub(crate) poisoned: AtomicU64,
    pub(crate) cancelled: AtomicU64,
    pub(crate) deduped: AtomicU64,
}

impl SchedulerStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            poisoned: self.poisoned.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            deduped: self.deduped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub completed: u64,
    pub poisoned: u64,
    pub cancelled: u64,
    pub deduped: u64,
}

/// Trace an operator state transition.
#[cfg(feature = "tracing")]
pub(crate) fn trace_state(op: partwise_core::id::OpId, name: &str, state: &str) {
    tracing::trace!(op = %op, name, state, "operator state");
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn trace_state(_op: partwise_core::id::OpId, _name: &str, _state: &str) {}
