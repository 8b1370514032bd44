//! Eager set-algebra kernels over valid index spaces.
//!
//! Everything is rectangle-at-a-time: operand entry pairs are intersected at
//! the rect level, bitmap pairs over identical bounds go through the
//! word-wise AND/OR/AND-NOT paths, everything else decomposes into
//! dimension-0 runs. `build_entries` consolidates the resulting pieces and
//! collapses pathologically fragmented outputs into a single bitmap entry.
//!
//! The deferred operators in partwise-ops call these kernels after their
//! preconditions trigger.

use partwise_core::point::{Coord, Point};
use partwise_core::rect::Rect;

use crate::bitmap::BitMap;
use crate::space::IndexSpace;
use crate::sparsity::SparsityEntry;

/// Bitmap collapse is skipped when the bounding box has more bits than this
/// (a sparse scatter over a huge box is better left as rects).
const MAX_BITMAP_BITS: u64 = 1 << 24;

/// Points in both `a` and `b`.
pub fn intersection_entries<const N: usize, T: Coord>(
    a: &IndexSpace<N, T>,
    b: &IndexSpace<N, T>,
    threshold: usize,
) -> Vec<SparsityEntry<N, T>> {
    let clip = a.bounds.intersection(&b.bounds);
    if clip.is_empty() {
        return Vec::new();
    }
    // Dense x dense stays dense: one rect, no bitmap.
    if a.is_dense() && b.is_dense() {
        return vec![SparsityEntry::dense(clip)];
    }
    // Word-wise fast path: single bitmap entries over identical bounds.
    if let (Some(ba), Some(bb)) = (single_bitmap(a), single_bitmap(b)) {
        if ba.bounds() == bb.bounds() && clip.contains_rect(ba.bounds()) {
            let anded = ba.and(&bb);
            if anded.is_empty() {
                return Vec::new();
            }
            return vec![SparsityEntry::with_bitmap(anded)];
        }
    }
    let mut pieces = Vec::new();
    for ra in a.rects() {
        let ra = ra.intersection(&clip);
        if ra.is_empty() {
            continue;
        }
        for rb in b.rects() {
            let r = ra.intersection(&rb);
            if !r.is_empty() {
                pieces.push(r);
            }
        }
    }
    build_entries(pieces, threshold)
}

/// Points in any of `xs`.
pub fn union_entries<const N: usize, T: Coord>(
    xs: &[IndexSpace<N, T>],
    threshold: usize,
) -> Vec<SparsityEntry<N, T>> {
    let mut acc: Vec<Rect<N, T>> = Vec::new();
    for x in xs {
        for r in x.rects() {
            accumulate_disjoint(&mut acc, r);
        }
    }
    build_entries(acc, threshold)
}

/// Points in `a` not in `b`.
pub fn difference_entries<const N: usize, T: Coord>(
    a: &IndexSpace<N, T>,
    b: &IndexSpace<N, T>,
    threshold: usize,
) -> Vec<SparsityEntry<N, T>> {
    // Word-wise fast path mirrors the intersection one.
    if let (Some(ba), Some(bb)) = (single_bitmap(a), single_bitmap(b)) {
        if ba.bounds() == bb.bounds() {
            let diff = ba.and_not(&bb);
            if diff.is_empty() {
                return Vec::new();
            }
            return vec![SparsityEntry::with_bitmap(diff)];
        }
    }
    let mut pieces = Vec::new();
    for ra in a.rects() {
        if !ra.overlaps(&b.bounds) {
            pieces.push(ra);
            continue;
        }
        let mut rest = vec![ra];
        for rb in b.rects() {
            let mut next = Vec::new();
            for piece in &rest {
                piece.subtract_into(&rb, &mut next);
            }
            rest = next;
            if rest.is_empty() {
                break;
            }
        }
        pieces.extend(rest);
    }
    build_entries(pieces, threshold)
}

/// The space's bitmap, if it is exactly one bitmap entry (no nesting).
fn single_bitmap<const N: usize, T: Coord>(s: &IndexSpace<N, T>) -> Option<BitMap<N, T>> {
    let map = s.sparsity.as_ref()?;
    let entries = map.entries();
    match &*entries {
        [entry] if entry.sub_sparsity.is_none() && s.bounds.contains_rect(&entry.bounds) => {
            entry.bitmap.clone()
        }
        _ => None,
    }
}

/// Add `r` to a list of pairwise-disjoint rects, keeping it disjoint.
fn accumulate_disjoint<const N: usize, T: Coord>(acc: &mut Vec<Rect<N, T>>, r: Rect<N, T>) {
    if r.is_empty() {
        return;
    }
    let mut pieces = vec![r];
    for e in acc.iter() {
        let mut next = Vec::new();
        for piece in &pieces {
            piece.subtract_into(e, &mut next);
        }
        pieces = next;
        if pieces.is_empty() {
            return;
        }
    }
    acc.extend(pieces);
}

/// Turn a disjoint piece list into sparsity entries: sort into scan order,
/// merge adjacent mergeable rects, and collapse into one bitmap entry when
/// the piece count stays above `threshold`.
pub fn build_entries<const N: usize, T: Coord>(
    mut pieces: Vec<Rect<N, T>>,
    threshold: usize,
) -> Vec<SparsityEntry<N, T>> {
    pieces.retain(|r| !r.is_empty());
    if pieces.is_empty() {
        return Vec::new();
    }
    pieces.sort_by(|x, y| x.lo.scan_cmp(&y.lo));
    consolidate(&mut pieces);

    if pieces.len() > threshold.max(1) {
        let mut bbox = Rect::empty();
        let mut points = 0u64;
        for p in &pieces {
            bbox = bbox.bounding_union(p);
            points += p.volume();
        }
        if bbox.volume() <= MAX_BITMAP_BITS {
            let mut bm = BitMap::new(bbox);
            for p in &pieces {
                let len = p.extent(0);
                for row in rows_of(p) {
                    bm.set_run(&row, len);
                }
            }
            debug_assert_eq!(bm.count(), points);
            return vec![SparsityEntry::with_bitmap(bm)];
        }
    }
    pieces.into_iter().map(SparsityEntry::dense).collect()
}

/// Merge pairs of rects that are adjacent along exactly one dimension and
/// identical in all others. Repeats until a pass makes no progress.
fn consolidate<const N: usize, T: Coord>(pieces: &mut Vec<Rect<N, T>>) {
    loop {
        let mut merged_any = false;
        let mut i = 0;
        while i < pieces.len() {
            let mut j = i + 1;
            while j < pieces.len() {
                if let Some(m) = try_merge(&pieces[i], &pieces[j]) {
                    pieces[i] = m;
                    pieces.swap_remove(j);
                    merged_any = true;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
        if !merged_any {
            return;
        }
    }
}

fn try_merge<const N: usize, T: Coord>(a: &Rect<N, T>, b: &Rect<N, T>) -> Option<Rect<N, T>> {
    let mut join_dim = None;
    for d in 0..N {
        if a.lo[d] == b.lo[d] && a.hi[d] == b.hi[d] {
            continue;
        }
        let adjacent = a.hi[d].checked_add(T::ONE) == Some(b.lo[d])
            || b.hi[d].checked_add(T::ONE) == Some(a.lo[d]);
        if !adjacent || join_dim.is_some() {
            return None;
        }
        join_dim = Some(d);
    }
    let d = join_dim?;
    let mut m = *a;
    m.lo[d] = a.lo[d].min(b.lo[d]);
    m.hi[d] = a.hi[d].max(b.hi[d]);
    Some(m)
}

/// Row start points of a rect: every point with coordinate 0 pinned to
/// `lo[0]`. Each row holds `extent(0)` points.
pub(crate) fn rows_of<const N: usize, T: Coord>(r: &Rect<N, T>) -> impl Iterator<Item = Point<N, T>> {
    let mut row_rect = *r;
    row_rect.hi[0] = row_rect.lo[0];
    row_rect.points()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparsity::SparsityMap;
    use partwise_core::id::SparsityId;

    fn line(lo: i64, hi: i64) -> IndexSpace<1, i64> {
        IndexSpace::dense(Rect::new([lo], [hi]))
    }

    fn sparse_line(id: u64, bounds: (i64, i64), pieces: &[(i64, i64)]) -> IndexSpace<1, i64> {
        let entries = pieces
            .iter()
            .map(|&(lo, hi)| SparsityEntry::dense(Rect::new([lo], [hi])))
            .collect();
        IndexSpace::sparse(
            Rect::new([bounds.0], [bounds.1]),
            SparsityMap::immediate(SparsityId::new(id), entries),
        )
    }

    fn total(entries: &[SparsityEntry<1, i64>]) -> u64 {
        entries
            .iter()
            .map(|e| e.count_within(&e.bounds))
            .sum()
    }

    #[test]
    fn dense_intersection_stays_dense() {
        let out = intersection_entries(&line(0, 50), &line(30, 90), 64);
        assert_eq!(out.len(), 1);
        assert!(out[0].bitmap.is_none());
        assert_eq!(out[0].bounds, Rect::new([30], [50]));
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let out = intersection_entries(&line(0, 10), &line(20, 30), 64);
        assert!(out.is_empty());
    }

    #[test]
    fn union_merges_adjacent_rects() {
        let out = union_entries(&[line(0, 4), line(5, 9)], 64);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bounds, Rect::new([0], [9]));
    }

    #[test]
    fn union_of_overlapping_spaces_counts_once() {
        let out = union_entries(&[line(0, 10), line(5, 15)], 64);
        assert_eq!(total(&out), 16);
    }

    #[test]
    fn difference_carves_a_hole() {
        let out = difference_entries(&line(0, 9), &line(3, 5), 64);
        assert_eq!(total(&out), 7);
        let bounds: Vec<_> = out.iter().map(|e| e.bounds).collect();
        assert_eq!(bounds, vec![Rect::new([0], [2]), Rect::new([6], [9])]);
    }

    #[test]
    fn difference_round_trip_property() {
        // difference(union(a,b), b) ⊆ a and intersect(a, difference(u, a)) = ∅
        let a = sparse_line(1, (0, 99), &[(0, 9), (40, 49)]);
        let b = sparse_line(2, (0, 99), &[(5, 14)]);
        let u = IndexSpace::sparse(
            Rect::new([0], [99]),
            SparsityMap::immediate(SparsityId::new(3), union_entries(&[a.clone(), b.clone()], 64)),
        );
        let d = SparsityMap::immediate(
            SparsityId::new(4),
            difference_entries(&u, &b, 64),
        );
        let d_space = IndexSpace::sparse(Rect::new([0], [99]), d);
        for p in d_space.points() {
            assert!(a.contains(&p));
        }
        let disj = SparsityMap::immediate(
            SparsityId::new(5),
            difference_entries(&u, &a, 64),
        );
        let disj_space = IndexSpace::sparse(Rect::new([0], [99]), disj);
        assert!(intersection_entries(&a, &disj_space, 64).is_empty());
    }

    #[test]
    fn two_dim_union_consolidates_into_one_rect() {
        let top: IndexSpace<2, i64> = IndexSpace::dense(Rect::new([0, 0], [3, 1]));
        let bottom: IndexSpace<2, i64> = IndexSpace::dense(Rect::new([0, 2], [3, 3]));
        let out = union_entries(&[top, bottom], 64);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bounds, Rect::new([0, 0], [3, 3]));
        assert!(out[0].bitmap.is_none());
    }

    #[test]
    fn fragmented_output_collapses_to_bitmap() {
        // Every third point: no two pieces merge, count > threshold.
        let pieces: Vec<Rect<1, i64>> = (0..30).map(|i| Rect::new([i * 3], [i * 3])).collect();
        let out = build_entries(pieces, 8);
        assert_eq!(out.len(), 1);
        let bm = out[0].bitmap.as_ref().expect("expected bitmap entry");
        assert_eq!(bm.count(), 30);
    }
}
