//! Image: the field values of a source's points, clipped to a codomain.

use partwise_core::error::Result;
use partwise_core::point::{Coord, Point};
use partwise_field::{FieldAccessor, FieldDataDescriptor, FieldValue};
use partwise_space::algebra::build_entries;
use partwise_space::IndexSpace;

use crate::output::{finalize_output, poison_outputs, RunAccum};
use crate::traits::{OpContext, PartitionOperator};

/// For each source s, the output's points are
/// `{ field(p) : p in s ∩ descriptor-space } ∩ codomain`. Duplicate images
/// collapse; outputs of distinct sources may overlap.
pub struct ImageOperator<const N: usize, T: Coord, const M: usize, S: Coord> {
    pub codomain: IndexSpace<M, S>,
    pub field_data: Vec<FieldDataDescriptor<N, T, Point<M, S>>>,
    pub sources: Vec<IndexSpace<N, T>>,
    pub outputs: Vec<IndexSpace<M, S>>,
}

impl<const N: usize, T, const M: usize, S> PartitionOperator for ImageOperator<N, T, M, S>
where
    T: Coord,
    S: Coord + FieldValue,
{
    fn name(&self) -> &'static str {
        "subspaces_by_image"
    }

    fn execute(&self, cx: &OpContext<'_>) -> Result<()> {
        debug_assert_eq!(self.sources.len(), self.outputs.len());
        let threshold = cx.config.consolidate_threshold;

        let mut per_source = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let mut images: Vec<Point<M, S>> = Vec::new();
            for desc in &self.field_data {
                let acc = FieldAccessor::new(cx.instances, desc)?;
                for r in desc.index_space.rects() {
                    for p in r.points() {
                        if !source.contains(&p) {
                            continue;
                        }
                        let v = acc.read(&p)?;
                        if self.codomain.contains(&v) {
                            images.push(v);
                        }
                    }
                }
            }
            images.sort_by(|a, b| a.scan_cmp(b));
            images.dedup();
            let mut runs = RunAccum::new();
            for v in images {
                runs.push(v);
            }
            per_source.push(build_entries(runs.finish(), threshold));
        }

        for (i, entries) in per_source.into_iter().enumerate() {
            finalize_output(cx.events, &self.outputs[i], entries);
        }
        Ok(())
    }

    fn poison_outputs(&self, cx: &OpContext<'_>) {
        poison_outputs(cx.events, &self.outputs);
    }
}
