//! Lex-order split kernels shared by the equal and weighted operators.
//!
//! The space's points are walked in scan order and sliced at cut positions
//! derived from cumulative weights, in units of the granularity:
//!
//!   units  = ceil(total_points / g)
//!   cut[i] = min(total_points, g * floor(units * W[0..i] / W_total))
//!
//! Equal split is the all-ones weight vector. Cut positions are monotone, so
//! outputs are disjoint by construction and their union is exactly the input.

use partwise_core::error::{Error, Result};
use partwise_core::point::Coord;
use partwise_core::rect::Rect;

use crate::algebra::rows_of;
use crate::space::IndexSpace;

/// Cut positions (length `weights.len() + 1`, starting at 0 and ending at
/// `total`) for slicing `total` points by the given weights.
pub fn split_cuts(total: u64, granularity: u64, weights: &[u64]) -> Result<Vec<u64>> {
    if weights.is_empty() {
        return Err(Error::Config("split requires at least one output".into()));
    }
    let w_total: u128 = weights.iter().map(|&w| w as u128).sum();
    if w_total == 0 {
        return Err(Error::Config("split weights sum to zero".into()));
    }
    let g = granularity.max(1);
    let units = total.div_ceil(g) as u128;

    let mut cuts = Vec::with_capacity(weights.len() + 1);
    cuts.push(0u64);
    let mut w_prefix: u128 = 0;
    for &w in weights {
        w_prefix += w as u128;
        let cut = (g as u128) * (units * w_prefix / w_total);
        cuts.push(u64::try_from(cut).unwrap_or(u64::MAX).min(total));
    }
    // The last prefix equals the total weight, so the formula already lands
    // on or past `total`; the clamp makes it exact.
    debug_assert_eq!(*cuts.last().unwrap(), total);
    Ok(cuts)
}

/// Slice the space's points in scan order at the given cut positions.
/// Returns one disjoint run list per slice.
pub fn split_space<const N: usize, T: Coord>(
    space: &IndexSpace<N, T>,
    cuts: &[u64],
) -> Vec<Vec<Rect<N, T>>> {
    let n = cuts.len().saturating_sub(1);
    let mut out = vec![Vec::new(); n];

    // Gather dimension-0 runs in global scan order. Entry order is not
    // guaranteed to be scan order across entries, so sort.
    let mut runs: Vec<Rect<N, T>> = Vec::new();
    for r in space.rects() {
        for row in rows_of(&r) {
            let mut run = Rect { lo: row, hi: row };
            run.hi[0] = r.hi[0];
            runs.push(run);
        }
    }
    runs.sort_by(|a, b| a.lo.scan_cmp(&b.lo));

    let mut pos = 0u64;
    let mut slice = 0usize;
    for run in runs {
        let mut lo0 = run.lo[0].to_i64();
        let mut remaining = run.extent(0);
        while remaining > 0 {
            while slice < n && cuts[slice + 1] <= pos {
                slice += 1;
            }
            if slice >= n {
                debug_assert!(false, "points beyond the final cut");
                return out;
            }
            let take = (cuts[slice + 1] - pos).min(remaining);
            let mut piece = run;
            piece.lo[0] = T::from_i64(lo0).expect("split coordinate out of scalar range");
            piece.hi[0] =
                T::from_i64(lo0 + take as i64 - 1).expect("split coordinate out of scalar range");
            out[slice].push(piece);
            pos += take;
            lo0 += take as i64;
            remaining -= take;
        }
    }
    out
}
