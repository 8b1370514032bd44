//! The operator trait and its execution context.

use partwise_core::config::EngineConfig;
use partwise_core::error::Result;
use partwise_core::id::{IdGen, SparsityId};
use partwise_event::EventTable;
use partwise_field::InstanceSource;

/// Engine-held resources an operator runs against. Built by the scheduler's
/// worker for each run; operators never outlive it.
pub struct OpContext<'a> {
    pub events: &'a EventTable,
    pub instances: &'a dyn InstanceSource,
    pub config: &'a EngineConfig,
    sparsity_ids: &'a IdGen,
}

impl<'a> OpContext<'a> {
    pub fn new(
        events: &'a EventTable,
        instances: &'a dyn InstanceSource,
        config: &'a EngineConfig,
        sparsity_ids: &'a IdGen,
    ) -> Self {
        OpContext {
            events,
            instances,
            config,
            sparsity_ids,
        }
    }

    /// Allocate a sparsity-map id for operator-internal intermediates (the
    /// fold operators chain eager kernels through scratch maps).
    pub fn alloc_sparsity_id(&self) -> SparsityId {
        SparsityId::new(self.sparsity_ids.next_raw())
    }
}

/// A deferred partition operator.
///
/// Contract:
/// - `execute` runs at most once, after the precondition triggered cleanly.
///   It validates inputs, fills every output's pending sparsity map, and
///   triggers each output's validity event. It does *not* touch the
///   completion event.
/// - `poison_outputs` runs instead of `execute` when the precondition was
///   poisoned or the engine is cancelling, and after a failed `execute`. It
///   finalizes every unwritten output empty and poisons its validity event.
pub trait PartitionOperator: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn execute(&self, cx: &OpContext<'_>) -> Result<()>;

    fn poison_outputs(&self, cx: &OpContext<'_>);
}
