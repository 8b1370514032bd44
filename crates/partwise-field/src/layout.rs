//! Explicit affine field layouts.
//!
//! An instance stores each field as a contiguous row-major block over the
//! instance's bounding rect (dimension 0 fastest, matching the engine's scan
//! order). The layout is resolved once when an accessor is created; after
//! that every point lookup is a handful of multiplies.

use partwise_core::error::{Error, Result};
use partwise_core::point::{Coord, Point};
use partwise_core::rect::Rect;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AffineLayout<const N: usize> {
    pub base_offset: usize,
    pub strides: [usize; N],
    pub element_size: usize,
}

impl<const N: usize> AffineLayout<N> {
    /// Layout of a field block inside an instance covering `bounds`:
    /// the block starts at `field_offset * bounds.volume()` and elements are
    /// packed in scan order.
    pub fn contiguous<T: Coord>(
        bounds: &Rect<N, T>,
        field_offset: usize,
        element_size: usize,
    ) -> Result<Self> {
        let volume = usize::try_from(bounds.volume()).map_err(|_| Error::Overflow)?;
        let base_offset = field_offset
            .checked_mul(volume)
            .ok_or(Error::Overflow)?;
        let mut strides = [0usize; N];
        let mut stride = element_size;
        for (d, slot) in strides.iter_mut().enumerate() {
            *slot = stride;
            stride = stride
                .checked_mul(usize::try_from(bounds.extent(d)).map_err(|_| Error::Overflow)?)
                .ok_or(Error::Overflow)?;
        }
        Ok(AffineLayout {
            base_offset,
            strides,
            element_size,
        })
    }

    /// Byte offset of the element for `p`, relative to the instance origin.
    /// The caller guarantees `p` lies inside the rect the layout was resolved
    /// against.
    pub fn offset_of<T: Coord>(&self, lo: &Point<N, T>, p: &Point<N, T>) -> usize {
        let mut off = self.base_offset;
        for d in 0..N {
            let steps = (p[d].to_i64() - lo[d].to_i64()) as usize;
            off += steps * self.strides[d];
        }
        off
    }
}
