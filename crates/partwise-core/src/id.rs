//! Typed identifiers and the per-engine id allocator.
//!
//! Every id family is a thin wrapper over a nonzero u64 with a short display
//! tag, so log lines read `op12` / `sp3` instead of bare numbers. Raw zero is
//! reserved across all families; `IdGen` never hands it out, which lets raw
//! ids double as "absent" sentinels where needed.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! id_family {
    ($(#[$doc:meta])* $name:ident tagged $tag:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

id_family! {
    /// One operator request, assigned at submission.
    OpId tagged "op"
}
id_family! {
    /// A sparsity map's global name within its engine.
    SparsityId tagged "sp"
}
id_family! {
    /// An opaque region-instance handle.
    InstanceId tagged "inst"
}
id_family! {
    /// A work item parked on an event's waiter list.
    WaiterId tagged "w"
}

/// Monotonic allocator for one id family. Namespaced per engine instance:
/// each engine owns its own generators, never global state.
pub struct IdGen {
    next: AtomicU64,
}

impl IdGen {
    pub fn new() -> Self {
        IdGen {
            next: AtomicU64::new(1),
        }
    }

    /// Hand out the next raw id, starting from 1.
    pub fn next_raw(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdGen {
    fn default() -> Self {
        IdGen::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_with_their_tag() {
        assert_eq!(OpId::new(12).to_string(), "op12");
        assert_eq!(format!("{:?}", SparsityId::new(3)), "sp3");
        assert_eq!(InstanceId::new(7).raw(), 7);
    }

    #[test]
    fn generator_starts_at_one_and_counts_up() {
        let ids = IdGen::new();
        assert_eq!(ids.next_raw(), 1);
        assert_eq!(ids.next_raw(), 2);
        assert_eq!(WaiterId::new(ids.next_raw()), WaiterId::new(3));
    }
}
