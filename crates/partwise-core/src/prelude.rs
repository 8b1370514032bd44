//! Convenient re-exports for downstream crates.

pub use crate::config::EngineConfig;
pub use crate::digest::Digest;
pub use crate::error::{Error, Result};
pub use crate::id::{IdGen, InstanceId, OpId, SparsityId, WaiterId};
pub use crate::point::{Coord, Point};
pub use crate::rect::{PointIter, Rect};
