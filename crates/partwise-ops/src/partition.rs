//! Equal and weighted splits: pure algorithmic operators, no field data.

use partwise_core::error::Result;
use partwise_core::point::Coord;
use partwise_space::algebra::build_entries;
use partwise_space::split::{split_cuts, split_space};
use partwise_space::IndexSpace;

use crate::output::{finalize_output, poison_outputs};
use crate::traits::{OpContext, PartitionOperator};

/// Slice the space's points in scan order into `outputs.len()` pieces whose
/// sizes differ by at most one granularity unit, lower-indexed outputs
/// receiving the extra points.
pub struct EqualSplitOperator<const N: usize, T: Coord> {
    pub space: IndexSpace<N, T>,
    pub granularity: u64,
    pub outputs: Vec<IndexSpace<N, T>>,
}

impl<const N: usize, T: Coord> PartitionOperator for EqualSplitOperator<N, T> {
    fn name(&self) -> &'static str {
        "equal_subspaces"
    }

    fn execute(&self, cx: &OpContext<'_>) -> Result<()> {
        let weights = vec![1u64; self.outputs.len()];
        run_split(cx, &self.space, self.granularity, &weights, &self.outputs)
    }

    fn poison_outputs(&self, cx: &OpContext<'_>) {
        poison_outputs(cx.events, &self.outputs);
    }
}

/// Slice the space's points in scan order into pieces whose sizes are
/// proportional to the weights.
pub struct WeightedSplitOperator<const N: usize, T: Coord> {
    pub space: IndexSpace<N, T>,
    pub granularity: u64,
    pub weights: Vec<u64>,
    pub outputs: Vec<IndexSpace<N, T>>,
}

impl<const N: usize, T: Coord> PartitionOperator for WeightedSplitOperator<N, T> {
    fn name(&self) -> &'static str {
        "weighted_subspaces"
    }

    fn execute(&self, cx: &OpContext<'_>) -> Result<()> {
        run_split(
            cx,
            &self.space,
            self.granularity,
            &self.weights,
            &self.outputs,
        )
    }

    fn poison_outputs(&self, cx: &OpContext<'_>) {
        poison_outputs(cx.events, &self.outputs);
    }
}

fn run_split<const N: usize, T: Coord>(
    cx: &OpContext<'_>,
    space: &IndexSpace<N, T>,
    granularity: u64,
    weights: &[u64],
    outputs: &[IndexSpace<N, T>],
) -> Result<()> {
    debug_assert_eq!(weights.len(), outputs.len());
    let total = space.volume();
    let cuts = split_cuts(total, granularity, weights)?;
    let slices = split_space(space, &cuts);
    let threshold = cx.config.consolidate_threshold;
    for (i, pieces) in slices.into_iter().enumerate() {
        finalize_output(cx.events, &outputs[i], build_entries(pieces, threshold));
    }
    Ok(())
}
