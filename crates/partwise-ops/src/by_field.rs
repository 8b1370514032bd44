//! Partition-by-field: bucket the parent's points by an observed field value.

use std::collections::HashMap;
use std::hash::Hash;

use partwise_core::error::Result;
use partwise_core::point::Coord;
use partwise_field::{FieldAccessor, FieldDataDescriptor, FieldValue};
use partwise_space::algebra::build_entries;
use partwise_space::IndexSpace;

use crate::output::{finalize_output, poison_outputs, RunAccum};
use crate::traits::{OpContext, PartitionOperator};

/// For each requested color c, the output's points are exactly the points p
/// of `parent` with `field(p) == c`. Distinct colors yield disjoint outputs;
/// points whose color was not requested are silently dropped.
pub struct ByFieldOperator<const N: usize, T: Coord, C> {
    pub parent: IndexSpace<N, T>,
    pub field_data: Vec<FieldDataDescriptor<N, T, C>>,
    pub colors: Vec<C>,
    pub outputs: Vec<IndexSpace<N, T>>,
}

impl<const N: usize, T, C> PartitionOperator for ByFieldOperator<N, T, C>
where
    T: Coord,
    C: FieldValue + Eq + Hash,
{
    fn name(&self) -> &'static str {
        "subspaces_by_field"
    }

    fn execute(&self, cx: &OpContext<'_>) -> Result<()> {
        debug_assert_eq!(self.colors.len(), self.outputs.len());
        let slot_of: HashMap<&C, usize> = self
            .colors
            .iter()
            .enumerate()
            .map(|(i, c)| (c, i))
            .collect();
        let mut accums: Vec<RunAccum<N, T>> =
            (0..self.colors.len()).map(|_| RunAccum::new()).collect();

        for desc in &self.field_data {
            let acc = FieldAccessor::new(cx.instances, desc)?;
            for r in desc.index_space.rects() {
                for p in r.points() {
                    if !self.parent.contains(&p) {
                        continue;
                    }
                    let color = acc.read(&p)?;
                    if let Some(&slot) = slot_of.get(&color) {
                        accums[slot].push(p);
                    }
                }
            }
        }

        let threshold = cx.config.consolidate_threshold;
        for (slot, runs) in accums.into_iter().enumerate() {
            let entries = build_entries(runs.finish(), threshold);
            finalize_output(cx.events, &self.outputs[slot], entries);
        }
        Ok(())
    }

    fn poison_outputs(&self, cx: &OpContext<'_>) {
        poison_outputs(cx.events, &self.outputs);
    }
}
