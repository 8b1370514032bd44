//! Index spaces: a bounding rect plus an optional sparsity refinement.

use std::fmt;

use partwise_core::point::{Coord, Point};
use partwise_core::rect::Rect;
use partwise_event::EventId;

use crate::sparsity::SparsityMap;

/// A set of integer points. Dense iff `sparsity` is absent, in which case the
/// points are exactly `bounds`; otherwise the points are the union of the
/// entries' contributions clipped to `bounds`.
#[derive(Clone)]
pub struct IndexSpace<const N: usize, T: Coord> {
    pub bounds: Rect<N, T>,
    pub sparsity: Option<SparsityMap<N, T>>,
}

impl<const N: usize, T: Coord> IndexSpace<N, T> {
    pub fn dense(bounds: Rect<N, T>) -> Self {
        IndexSpace {
            bounds,
            sparsity: None,
        }
    }

    pub fn empty() -> Self {
        IndexSpace {
            bounds: Rect::empty(),
            sparsity: None,
        }
    }

    pub fn sparse(bounds: Rect<N, T>, sparsity: SparsityMap<N, T>) -> Self {
        IndexSpace {
            bounds,
            sparsity: Some(sparsity),
        }
    }

    pub fn is_dense(&self) -> bool {
        self.sparsity.is_none()
    }

    /// The validity event of the backing sparsity map (`NONE` for dense
    /// spaces). Operators merge this into their preconditions so they never
    /// observe pending inputs.
    pub fn validity_event(&self) -> EventId {
        self.sparsity
            .as_ref()
            .map(|s| s.validity())
            .unwrap_or(EventId::NONE)
    }

    /// Queries below require a valid space (dense, or sparsity finalized).

    pub fn contains(&self, p: &Point<N, T>) -> bool {
        if !self.bounds.contains_point(p) {
            return false;
        }
        match &self.sparsity {
            None => true,
            Some(map) => map.contains(p),
        }
    }

    pub fn volume(&self) -> u64 {
        match &self.sparsity {
            None => self.bounds.volume(),
            Some(map) => map
                .entries()
                .iter()
                .map(|e| e.count_within(&self.bounds))
                .sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.sparsity {
            None => self.bounds.is_empty(),
            Some(_) => self.rects().next().is_none(),
        }
    }

    pub fn overlaps(&self, other: &IndexSpace<N, T>) -> bool {
        if !self.bounds.overlaps(&other.bounds) {
            return false;
        }
        for a in self.rects() {
            for b in other.rects() {
                if a.overlaps(&b) {
                    return true;
                }
            }
        }
        false
    }

    /// Shrink the bounds to the tight bounding box of the points. The
    /// sparsity map (if any) is shared, not recomputed.
    pub fn tighten(&self) -> IndexSpace<N, T> {
        match &self.sparsity {
            None => self.clone(),
            Some(_) => {
                let mut bbox = Rect::empty();
                for r in self.rects() {
                    bbox = bbox.bounding_union(&r);
                }
                if bbox.is_empty() {
                    IndexSpace::empty()
                } else {
                    IndexSpace {
                        bounds: bbox,
                        sparsity: self.sparsity.clone(),
                    }
                }
            }
        }
    }

    /// Lazy sequence of disjoint non-empty rects covering the space: entry
    /// order across entries, scan-order runs within bitmap entries. Finite
    /// and restartable from a saved cursor.
    pub fn rects(&self) -> SpaceRectIter<N, T> {
        SpaceRectIter {
            space: self.clone(),
            cursor: SpaceCursor::default(),
            entry_rects: None,
        }
    }

    /// All points of the space in per-rect scan order.
    pub fn points(&self) -> impl Iterator<Item = Point<N, T>> {
        self.rects().flat_map(|r| r.points())
    }
}

impl<const N: usize, T: Coord> From<Rect<N, T>> for IndexSpace<N, T> {
    fn from(bounds: Rect<N, T>) -> Self {
        IndexSpace::dense(bounds)
    }
}

impl<const N: usize, T: Coord> fmt::Debug for IndexSpace<N, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sparsity {
            None => write!(f, "IndexSpace({:?})", self.bounds),
            Some(m) => write!(f, "IndexSpace({:?}, {})", self.bounds, m.id()),
        }
    }
}

/// Resumable position inside a [`SpaceRectIter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpaceCursor {
    pub entry: usize,
    pub run: usize,
}

pub struct SpaceRectIter<const N: usize, T: Coord> {
    space: IndexSpace<N, T>,
    cursor: SpaceCursor,
    /// Rects of the entry the cursor points at, materialized on demand.
    entry_rects: Option<Vec<Rect<N, T>>>,
}

impl<const N: usize, T: Coord> SpaceRectIter<N, T> {
    pub fn cursor(&self) -> SpaceCursor {
        self.cursor
    }

    /// Restart a fresh iterator of the same space at a saved cursor.
    pub fn resume_at(space: &IndexSpace<N, T>, cursor: SpaceCursor) -> Self {
        SpaceRectIter {
            space: space.clone(),
            cursor,
            entry_rects: None,
        }
    }
}

impl<const N: usize, T: Coord> Iterator for SpaceRectIter<N, T> {
    type Item = Rect<N, T>;

    fn next(&mut self) -> Option<Rect<N, T>> {
        let map = match &self.space.sparsity {
            None => {
                // Dense: exactly one rect, the bounds.
                if self.cursor.entry == 0 && !self.space.bounds.is_empty() {
                    self.cursor.entry = 1;
                    return Some(self.space.bounds);
                }
                return None;
            }
            Some(map) => map,
        };

        loop {
            if self.entry_rects.is_none() {
                let rects = {
                    let entries = map.entries();
                    match entries.get(self.cursor.entry) {
                        None => return None,
                        Some(entry) => entry.rects_within(&self.space.bounds),
                    }
                };
                self.entry_rects = Some(rects);
            }
            if let Some(rects) = &self.entry_rects {
                if let Some(r) = rects.get(self.cursor.run) {
                    self.cursor.run += 1;
                    return Some(*r);
                }
            }
            self.cursor.entry += 1;
            self.cursor.run = 0;
            self.entry_rects = None;
        }
    }
}
