//! Request digests for the scheduler's in-flight dedup.
//!
//! A `Digest` names one operator request: kind, input identities, parameters,
//! precondition. Two submissions with the same digest are the same request.
//! The serialized request streams straight into the hasher; nothing is
//! buffered, and this never sits on a per-point hot path.

use std::fmt;

use serde::Serialize;

use crate::error::Result;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Stable digest of a serializable request description.
    pub fn of<T: Serialize>(value: &T) -> Result<Self> {
        let mut hasher = blake3::Hasher::new();
        serde_json::to_writer(&mut hasher, value)?;
        Ok(Digest(hasher.finalize().into()))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The leading bytes are plenty to tell requests apart in a log line.
        write!(f, "digest(")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..)")
    }
}
