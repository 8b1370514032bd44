//! In-flight request dedup.
//!
//! Requests are keyed by a stable digest over (kind, input identities,
//! parameters). A hit returns the original request's completion event and
//! output spaces; entries are evicted when the completion triggers, so
//! completed requests always recompute (their sparsity maps are immutable
//! and cheap to share by handle instead). This is an optimization only --
//! two identical requests racing past each other is harmless.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use partwise_core::digest::Digest;
use partwise_event::EventId;

struct DedupEntry {
    completion: EventId,
    outputs: Arc<dyn Any + Send + Sync>,
}

#[derive(Default)]
pub struct DedupCache {
    map: Mutex<HashMap<Digest, DedupEntry>>,
}

impl DedupCache {
    /// Look up an in-flight request with the same digest. The outputs only
    /// come back if their concrete type matches, which also guards against
    /// digest collisions across dimensionalities.
    pub fn lookup<R: Clone + 'static>(&self, key: &Digest) -> Option<(EventId, R)> {
        let map = self.map.lock();
        let entry = map.get(key)?;
        let outputs = entry.outputs.downcast_ref::<R>()?.clone();
        Some((entry.completion, outputs))
    }

    pub fn insert<R: Clone + Send + Sync + 'static>(
        &self,
        key: Digest,
        completion: EventId,
        outputs: R,
    ) {
        self.map.lock().insert(
            key,
            DedupEntry {
                completion,
                outputs: Arc::new(outputs),
            },
        );
    }

    pub fn evict(&self, key: &Digest) {
        self.map.lock().remove(key);
    }
}
