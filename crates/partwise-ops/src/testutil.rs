//! Shared harness for driving operators directly, without a scheduler.

use partwise_core::config::EngineConfig;
use partwise_core::id::{IdGen, SparsityId};
use partwise_core::point::Coord;
use partwise_core::rect::Rect;
use partwise_event::EventTable;
use partwise_field::HeapInstances;
use partwise_space::sparsity::SparsityMap;
use partwise_space::IndexSpace;

use crate::traits::OpContext;

pub(crate) struct Harness {
    pub events: EventTable,
    pub instances: HeapInstances,
    pub config: EngineConfig,
    pub sparsity_ids: IdGen,
}

impl Harness {
    pub fn new() -> Self {
        Harness {
            events: EventTable::new(0),
            instances: HeapInstances::new(),
            config: EngineConfig::default(),
            sparsity_ids: IdGen::new(),
        }
    }

    pub fn context(&self) -> OpContext<'_> {
        OpContext::new(&self.events, &self.instances, &self.config, &self.sparsity_ids)
    }

    pub fn pending_output<const N: usize, T: Coord>(
        &self,
        bounds: Rect<N, T>,
    ) -> IndexSpace<N, T> {
        let id = SparsityId::new(self.sparsity_ids.next_raw());
        IndexSpace::sparse(bounds, SparsityMap::pending(id, self.events.create_event()))
    }

    pub fn pending_outputs<const N: usize, T: Coord>(
        &self,
        bounds: Rect<N, T>,
        count: usize,
    ) -> Vec<IndexSpace<N, T>> {
        (0..count).map(|_| self.pending_output(bounds)).collect()
    }
}
