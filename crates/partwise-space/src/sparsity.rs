//! Sparsity maps: named, immutable-once-valid point-set refinements.
//!
//! A map is created *pending* with a validity event; exactly one operator
//! contributes its entries exactly once, after which the map is valid and
//! immutable. Handles are cheap clones sharing the underlying storage, so a
//! valid map can back any number of index spaces.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use partwise_core::id::SparsityId;
use partwise_core::point::{Coord, Point};
use partwise_core::rect::Rect;
use partwise_event::EventId;

use crate::bitmap::BitMap;

/// One disjoint piece of a sparsity map. The entry's points are
/// `bounds ∩ bitmap-bits ∩ sub-sparsity-points` (missing refinements count
/// as "full").
#[derive(Clone, Debug)]
pub struct SparsityEntry<const N: usize, T: Coord> {
    pub bounds: Rect<N, T>,
    pub bitmap: Option<BitMap<N, T>>,
    pub sub_sparsity: Option<SparsityMap<N, T>>,
}

impl<const N: usize, T: Coord> SparsityEntry<N, T> {
    pub fn dense(bounds: Rect<N, T>) -> Self {
        SparsityEntry {
            bounds,
            bitmap: None,
            sub_sparsity: None,
        }
    }

    pub fn with_bitmap(bitmap: BitMap<N, T>) -> Self {
        SparsityEntry {
            bounds: *bitmap.bounds(),
            bitmap: Some(bitmap),
            sub_sparsity: None,
        }
    }

    pub fn contains(&self, p: &Point<N, T>) -> bool {
        if !self.bounds.contains_point(p) {
            return false;
        }
        if let Some(bm) = &self.bitmap {
            if !bm.contains(p) {
                return false;
            }
        }
        if let Some(sub) = &self.sub_sparsity {
            if !sub.contains(p) {
                return false;
            }
        }
        true
    }

    /// Point count inside `clip` (pass the entry bounds for the full count).
    pub fn count_within(&self, clip: &Rect<N, T>) -> u64 {
        let r = self.bounds.intersection(clip);
        if r.is_empty() {
            return 0;
        }
        match (&self.bitmap, &self.sub_sparsity) {
            (None, None) => r.volume(),
            _ => {
                // Refined entries are counted run by run.
                self.rects_within(&r).iter().map(|x| x.volume()).sum()
            }
        }
    }

    /// The entry's points inside `clip`, as disjoint rects in scan order.
    pub fn rects_within(&self, clip: &Rect<N, T>) -> Vec<Rect<N, T>> {
        let r = self.bounds.intersection(clip);
        if r.is_empty() {
            return Vec::new();
        }
        let base: Vec<Rect<N, T>> = match &self.bitmap {
            None => vec![r],
            Some(bm) => bm
                .runs()
                .into_iter()
                .filter_map(|run| {
                    let c = run.intersection(&r);
                    (!c.is_empty()).then_some(c)
                })
                .collect(),
        };
        match &self.sub_sparsity {
            None => base,
            Some(sub) => {
                let mut out = Vec::new();
                for b in base {
                    for e in sub.entries().iter() {
                        out.extend(e.rects_within(&b));
                    }
                }
                out
            }
        }
    }
}

struct MapData<const N: usize, T: Coord> {
    valid: bool,
    entries: Vec<SparsityEntry<N, T>>,
}

struct SparsityInner<const N: usize, T: Coord> {
    id: SparsityId,
    validity: EventId,
    contributed: AtomicBool,
    data: RwLock<MapData<N, T>>,
}

/// Reference-counted handle to a sparsity map.
#[derive(Clone)]
pub struct SparsityMap<const N: usize, T: Coord> {
    inner: Arc<SparsityInner<N, T>>,
}

impl<const N: usize, T: Coord> SparsityMap<N, T> {
    /// Allocate a pending map. `validity` is the event that will announce the
    /// entries; the creating operator triggers it after `finalize`.
    pub fn pending(id: SparsityId, validity: EventId) -> Self {
        SparsityMap {
            inner: Arc::new(SparsityInner {
                id,
                validity,
                contributed: AtomicBool::new(false),
                data: RwLock::new(MapData {
                    valid: false,
                    entries: Vec::new(),
                }),
            }),
        }
    }

    /// A map that is valid from birth (used for literal test inputs and for
    /// spaces built eagerly outside any operator).
    pub fn immediate(id: SparsityId, entries: Vec<SparsityEntry<N, T>>) -> Self {
        let map = Self::pending(id, EventId::NONE);
        map.finalize(entries);
        map
    }

    pub fn id(&self) -> SparsityId {
        self.inner.id
    }

    pub fn validity(&self) -> EventId {
        self.inner.validity
    }

    pub fn is_valid(&self) -> bool {
        self.inner.data.read().valid
    }

    /// Install the entries. Exactly one contributor may call this exactly
    /// once; a second write is a programming error and panics. Triggering the
    /// validity event remains the caller's job, *after* this returns.
    pub fn finalize(&self, entries: Vec<SparsityEntry<N, T>>) {
        let first = self
            .inner
            .contributed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        assert!(first, "sparsity map {} written twice", self.inner.id);
        debug_assert!(entries_disjoint(&entries));
        let mut data = self.inner.data.write();
        data.entries = entries;
        data.valid = true;
    }

    /// Whether some operator already contributed entries.
    pub fn has_contributor(&self) -> bool {
        self.inner.contributed.load(Ordering::Acquire)
    }

    /// Read access to the entries. Panics on a pending map: readers must
    /// order themselves after the validity event.
    pub fn entries(&self) -> EntriesGuard<'_, N, T> {
        let g = self.inner.data.read();
        assert!(g.valid, "sparsity map {} read before valid", self.inner.id);
        EntriesGuard { guard: g }
    }

    pub fn contains(&self, p: &Point<N, T>) -> bool {
        self.entries().iter().any(|e| e.contains(p))
    }
}

impl<const N: usize, T: Coord> fmt::Debug for SparsityMap<N, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SparsityMap({}, {})",
            self.inner.id,
            if self.is_valid() { "valid" } else { "pending" }
        )
    }
}

/// RAII view over a valid map's entries.
pub struct EntriesGuard<'a, const N: usize, T: Coord> {
    guard: parking_lot::RwLockReadGuard<'a, MapData<N, T>>,
}

impl<const N: usize, T: Coord> std::ops::Deref for EntriesGuard<'_, N, T> {
    type Target = [SparsityEntry<N, T>];
    fn deref(&self) -> &Self::Target {
        &self.guard.entries
    }
}

fn entries_disjoint<const N: usize, T: Coord>(entries: &[SparsityEntry<N, T>]) -> bool {
    for (i, a) in entries.iter().enumerate() {
        for b in &entries[i + 1..] {
            if a.bounds.overlaps(&b.bounds) {
                return false;
            }
        }
    }
    true
}
