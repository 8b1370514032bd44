//! Deferred wrappers over the eager set-algebra kernels.
//!
//! Two shapes cover every entry point:
//! - `PairwiseSetOperator`: one output per left-hand space, combined with the
//!   matching right-hand space (or a single broadcast one).
//! - `FoldSetOperator`: a whole slice folded into a single output (union or
//!   intersection of everything).
//!
//! All outputs of one operator share the operator's precondition and become
//! valid together, before the shared completion event triggers.

use partwise_core::error::{Error, Result};
use partwise_core::point::Coord;
use partwise_space::algebra::{difference_entries, intersection_entries, union_entries};
use partwise_space::sparsity::SparsityMap;
use partwise_space::IndexSpace;

use crate::output::{finalize_output, poison_outputs};
use crate::traits::{OpContext, PartitionOperator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOpKind {
    Union,
    Intersection,
    Difference,
}

/// `outputs[i] = lhs[i] op rhs[i]` (or `op rhs[0]` when a single right-hand
/// side is broadcast across the batch).
pub struct PairwiseSetOperator<const N: usize, T: Coord> {
    pub kind: SetOpKind,
    pub lhs: Vec<IndexSpace<N, T>>,
    pub rhs: Vec<IndexSpace<N, T>>,
    pub outputs: Vec<IndexSpace<N, T>>,
}

impl<const N: usize, T: Coord> PartitionOperator for PairwiseSetOperator<N, T> {
    fn name(&self) -> &'static str {
        match self.kind {
            SetOpKind::Union => "compute_unions",
            SetOpKind::Intersection => "compute_intersections",
            SetOpKind::Difference => "compute_differences",
        }
    }

    fn execute(&self, cx: &OpContext<'_>) -> Result<()> {
        if self.rhs.len() != self.lhs.len() && self.rhs.len() != 1 {
            return Err(Error::Config(format!(
                "{}: {} left-hand spaces vs {} right-hand",
                self.name(),
                self.lhs.len(),
                self.rhs.len()
            )));
        }
        debug_assert_eq!(self.lhs.len(), self.outputs.len());
        let threshold = cx.config.consolidate_threshold;

        let mut results = Vec::with_capacity(self.lhs.len());
        for (i, a) in self.lhs.iter().enumerate() {
            let b = if self.rhs.len() == 1 {
                &self.rhs[0]
            } else {
                &self.rhs[i]
            };
            let entries = match self.kind {
                SetOpKind::Union => union_entries(&[a.clone(), b.clone()], threshold),
                SetOpKind::Intersection => intersection_entries(a, b, threshold),
                SetOpKind::Difference => difference_entries(a, b, threshold),
            };
            results.push(entries);
        }

        for (i, entries) in results.into_iter().enumerate() {
            finalize_output(cx.events, &self.outputs[i], entries);
        }
        Ok(())
    }

    fn poison_outputs(&self, cx: &OpContext<'_>) {
        poison_outputs(cx.events, &self.outputs);
    }
}

/// Fold a whole slice into one output: the union of all inputs, or the
/// intersection of all inputs.
pub struct FoldSetOperator<const N: usize, T: Coord> {
    pub kind: SetOpKind,
    pub inputs: Vec<IndexSpace<N, T>>,
    pub output: IndexSpace<N, T>,
}

impl<const N: usize, T: Coord> PartitionOperator for FoldSetOperator<N, T> {
    fn name(&self) -> &'static str {
        match self.kind {
            SetOpKind::Union => "compute_union",
            SetOpKind::Intersection => "compute_intersection",
            SetOpKind::Difference => "compute_difference",
        }
    }

    fn execute(&self, cx: &OpContext<'_>) -> Result<()> {
        let threshold = cx.config.consolidate_threshold;
        let entries = match self.kind {
            SetOpKind::Union => union_entries(&self.inputs, threshold),
            SetOpKind::Intersection => {
                let Some((first, rest)) = self.inputs.split_first() else {
                    return Err(Error::Config(
                        "compute_intersection of an empty slice".into(),
                    ));
                };
                let mut acc = first.clone();
                let mut entries = acc
                    .sparsity
                    .as_ref()
                    .map(|m| m.entries().to_vec())
                    .unwrap_or_else(|| {
                        partwise_space::algebra::build_entries(vec![acc.bounds], threshold)
                    });
                for x in rest {
                    entries = intersection_entries(&acc, x, threshold);
                    let bounds = acc.bounds.intersection(&x.bounds);
                    acc = IndexSpace::sparse(
                        bounds,
                        SparsityMap::immediate(cx.alloc_sparsity_id(), entries.clone()),
                    );
                }
                entries
            }
            SetOpKind::Difference => {
                if self.inputs.len() != 2 {
                    return Err(Error::Config(format!(
                        "compute_difference expects 2 operands, got {}",
                        self.inputs.len()
                    )));
                }
                difference_entries(&self.inputs[0], &self.inputs[1], threshold)
            }
        };
        finalize_output(cx.events, &self.output, entries);
        Ok(())
    }

    fn poison_outputs(&self, cx: &OpContext<'_>) {
        poison_outputs(cx.events, std::slice::from_ref(&self.output));
    }
}
