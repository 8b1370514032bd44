//! Preimage: the parent points whose pointer field lands in a target space.

use partwise_core::error::Result;
use partwise_core::point::{Coord, Point};
use partwise_field::{FieldAccessor, FieldDataDescriptor, FieldValue};
use partwise_space::algebra::build_entries;
use partwise_space::IndexSpace;

use crate::output::{finalize_output, poison_outputs, RunAccum};
use crate::traits::{OpContext, PartitionOperator};

/// For each target t, the output's points are `{ p in parent : field(p) in t }`.
/// Each output is computed independently: overlapping targets yield
/// overlapping outputs, disjoint targets disjoint ones.
pub struct PreimageOperator<const N: usize, T: Coord, const M: usize, S: Coord> {
    pub parent: IndexSpace<N, T>,
    pub field_data: Vec<FieldDataDescriptor<N, T, Point<M, S>>>,
    pub targets: Vec<IndexSpace<M, S>>,
    pub outputs: Vec<IndexSpace<N, T>>,
}

impl<const N: usize, T, const M: usize, S> PartitionOperator for PreimageOperator<N, T, M, S>
where
    T: Coord,
    S: Coord + FieldValue,
{
    fn name(&self) -> &'static str {
        "subspaces_by_preimage"
    }

    fn execute(&self, cx: &OpContext<'_>) -> Result<()> {
        debug_assert_eq!(self.targets.len(), self.outputs.len());
        let mut accums: Vec<RunAccum<N, T>> =
            (0..self.targets.len()).map(|_| RunAccum::new()).collect();

        for desc in &self.field_data {
            let acc = FieldAccessor::new(cx.instances, desc)?;
            for r in desc.index_space.rects() {
                for p in r.points() {
                    if !self.parent.contains(&p) {
                        continue;
                    }
                    let v = acc.read(&p)?;
                    for (i, target) in self.targets.iter().enumerate() {
                        if target.contains(&v) {
                            accums[i].push(p);
                        }
                    }
                }
            }
        }

        let threshold = cx.config.consolidate_threshold;
        for (i, runs) in accums.into_iter().enumerate() {
            let entries = build_entries(runs.finish(), threshold);
            finalize_output(cx.events, &self.outputs[i], entries);
        }
        Ok(())
    }

    fn poison_outputs(&self, cx: &OpContext<'_>) {
        poison_outputs(cx.events, &self.outputs);
    }
}
