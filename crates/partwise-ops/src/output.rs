//! Shared output plumbing for the operators.

use partwise_core::point::{Coord, Point};
use partwise_core::rect::Rect;
use partwise_event::EventTable;
use partwise_space::sparsity::SparsityEntry;
use partwise_space::IndexSpace;

/// Install entries into one output's pending map and announce validity.
pub(crate) fn finalize_output<const N: usize, T: Coord>(
    events: &EventTable,
    output: &IndexSpace<N, T>,
    entries: Vec<SparsityEntry<N, T>>,
) {
    let map = output
        .sparsity
        .as_ref()
        .expect("operator output carries no sparsity map");
    map.finalize(entries);
    events.trigger(map.validity());
}

/// Finalize every unwritten output empty and poison its validity event.
/// Safe to call after a partial failure: outputs that already became valid
/// are left alone.
pub(crate) fn poison_outputs<const N: usize, T: Coord>(
    events: &EventTable,
    outputs: &[IndexSpace<N, T>],
) {
    for output in outputs {
        let Some(map) = &output.sparsity else { continue };
        if !map.has_contributor() {
            map.finalize(Vec::new());
            events.trigger_poisoned(map.validity());
        }
    }
}

/// Accumulates scan-ordered points into maximal dimension-0 runs.
pub(crate) struct RunAccum<const N: usize, T: Coord> {
    runs: Vec<Rect<N, T>>,
    open: Option<Rect<N, T>>,
}

impl<const N: usize, T: Coord> RunAccum<N, T> {
    pub fn new() -> Self {
        RunAccum {
            runs: Vec::new(),
            open: None,
        }
    }

    pub fn push(&mut self, p: Point<N, T>) {
        if let Some(open) = &mut self.open {
            let same_row = (1..N).all(|d| open.hi[d] == p[d]);
            if same_row && open.hi[0].checked_add(T::ONE) == Some(p[0]) {
                open.hi[0] = p[0];
                return;
            }
            self.runs.push(*open);
        }
        self.open = Some(Rect { lo: p, hi: p });
    }

    pub fn finish(mut self) -> Vec<Rect<N, T>> {
        if let Some(open) = self.open.take() {
            self.runs.push(open);
        }
        self.runs
    }
}
