//! The seam between the event table and whoever owns the work items.
//!
//! The table stores only integer `WaiterId`s; on trigger it hands the woken
//! ids to the registered sink. The scheduler implements this and owns the
//! actual operator records, which breaks the cycle event -> work item ->
//! event.

use partwise_core::id::WaiterId;

pub trait EventSink: Send + Sync + 'static {
    /// Called after an event triggers, with the waiters registered on it in
    /// FIFO order. `poisoned` reflects the event's poisoned flag.
    fn wake(&self, waiters: Vec<WaiterId>, poisoned: bool);
}
