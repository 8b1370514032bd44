#![forbid(unsafe_code)]
//! partwise-space: index spaces and their set algebra.
//!
//! An index space is a bounding rect, optionally refined by a sparsity map: a
//! disjoint collection of entries, each a rect optionally refined by a bitmap
//! or a nested map. This crate provides:
//! - the sparsity-map lifecycle (pending -> valid, single contributor),
//! - queries on valid spaces (contains/volume/is_empty/tighten/overlaps),
//! - a restartable rect iterator,
//! - eager set-algebra kernels (intersection/union/difference),
//! - lex-order split kernels shared by the equal/weighted operators.
//!
//! The deferred wrappers that run these kernels behind precondition events
//! live in partwise-ops.

pub mod algebra;
pub mod bitmap;
pub mod sparsity;
pub mod space;
pub mod split;

pub use bitmap::BitMap;
pub use sparsity::{SparsityEntry, SparsityMap};
pub use space::{IndexSpace, SpaceRectIter};
pub use split::{split_cuts, split_space};
