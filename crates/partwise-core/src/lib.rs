#![forbid(unsafe_code)]
//! partwise-core: the shared data model for the dependent-partitioning engine.
//!
//! This crate is pure data + arithmetic:
//! - `Point`/`Rect`: integer coordinate and rectangle algebra over 1-3 dims.
//! - typed ids for operators, sparsity maps, and instances, plus the
//!   per-engine `IdGen` allocator behind them.
//! - the engine-wide error taxonomy.
//! - `EngineConfig` (env-overridable).
//! - request digests used by the scheduler's dedup.
//!
//! No locks, no threads, no IO here. Higher crates (space/event/field/ops/exec)
//! build the actual engine out of these pieces.

pub mod config;
pub mod digest;
pub mod error;
pub mod id;
pub mod point;
pub mod prelude;
pub mod rect;

pub use config::EngineConfig;
pub use digest::Digest;
pub use error::{Error, Result};
pub use id::{IdGen, InstanceId, OpId, SparsityId, WaiterId};
pub use point::{Coord, Point};
pub use rect::{PointIter, Rect};

/// Engine version string for diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
