#![forbid(unsafe_code)]
//! partwise-exec: the engine context and operator scheduler.
//!
//! `Engine` owns the event table, the instance store, and a worker pool
//! pulling ready operators from a shared MPMC queue. Submissions attach to
//! their precondition's waiter list (augmented with the validity events of
//! every input sparsity map); when the precondition triggers, a worker runs
//! the operator to completion without suspension. Identical in-flight
//! requests can share a completion event and outputs (`EngineConfig::dedup`).

pub mod dedup;
pub mod engine;
pub mod metrics;
pub mod scheduler;

pub use engine::{Engine, PartitionableSpace};
pub use metrics::StatsSnapshot;
