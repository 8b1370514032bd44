#![forbid(unsafe_code)]
//! partwise-ops: the partition operators.
//!
//! Every operator is a deferred unit of work: the scheduler runs `execute`
//! once the (augmented) precondition triggers cleanly, or `poison_outputs`
//! when it was poisoned. Operators fill the pending sparsity maps of their
//! pre-allocated outputs and trigger the outputs' validity events; the
//! scheduler triggers the operator's completion event afterwards, so
//! completion always happens-after every output is valid.
//!
//! Operators compute all entries before finalizing any output: a failure can
//! only happen while no output has been written, which keeps poisoning
//! all-or-nothing.

pub mod by_field;
pub mod image;
mod output;
pub mod partition;
pub mod preimage;
pub mod setops;
#[cfg(test)]
mod testutil;
pub mod traits;

pub use by_field::ByFieldOperator;
pub use image::ImageOperator;
pub use partition::{EqualSplitOperator, WeightedSplitOperator};
pub use preimage::PreimageOperator;
pub use setops::{FoldSetOperator, PairwiseSetOperator, SetOpKind};
pub use traits::{OpContext, PartitionOperator};
