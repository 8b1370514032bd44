#![forbid(unsafe_code)]
//! partwise: a dependent-partitioning engine.
//!
//! Computes new index-space partitions as functions of existing partitions
//! and field data stored in region instances: partition-by-field, image,
//! preimage, set union/intersection/difference, and equal/weighted splits.
//! Every operator is deferred behind a completion event; chaining
//! preconditions builds a dataflow graph the engine executes as the data
//! becomes available.
//!
//! This crate re-exports the member crates' public surface:
//! - `partwise-core`: points, rects, ids, errors, config
//! - `partwise-space`: index spaces, sparsity maps, set algebra, splits
//! - `partwise-event`: one-shot events with waiters, merge, poisoning
//! - `partwise-field`: region instances and typed field accessors
//! - `partwise-ops`: the partition operators
//! - `partwise-exec`: the engine context and operator scheduler

pub use partwise_core::{
    Coord, Digest, EngineConfig, Error, IdGen, InstanceId, OpId, Point, Rect, Result, SparsityId,
};
pub use partwise_event::{EventId, EventSink, EventTable};
pub use partwise_exec::{Engine, PartitionableSpace, StatsSnapshot};
pub use partwise_field::{
    AffineLayout, FieldAccessor, FieldDataDescriptor, FieldValue, HeapInstances, InstanceSource,
};
pub use partwise_space::{BitMap, IndexSpace, SparsityEntry, SparsityMap};

/// The operator implementations, for callers that submit custom requests.
pub mod ops {
    pub use partwise_ops::*;
}
