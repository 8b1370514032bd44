//! Typed point -> value readers over field-data descriptors.

use partwise_core::error::{Error, Result};
use partwise_core::point::{Coord, Point};

use crate::instance::InstanceSource;
use crate::layout::AffineLayout;
use crate::FieldDataDescriptor;

/// Largest field value the accessor's stack buffer holds (a 3-d i64 point).
const MAX_VALUE_SIZE: usize = 24;

/// Field value types the engine can read out of instances. Values are
/// little-endian on the wire regardless of host order.
pub trait FieldValue: Copy + Send + Sync + 'static {
    const SIZE: usize;

    fn from_le_bytes(bytes: &[u8]) -> Self;
    fn write_le_bytes(&self, out: &mut [u8]);
}

impl FieldValue for i32 {
    const SIZE: usize = 4;

    fn from_le_bytes(bytes: &[u8]) -> Self {
        let mut b = [0u8; 4];
        b.copy_from_slice(bytes);
        i32::from_le_bytes(b)
    }

    fn write_le_bytes(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.to_le_bytes());
    }
}

impl FieldValue for i64 {
    const SIZE: usize = 8;

    fn from_le_bytes(bytes: &[u8]) -> Self {
        let mut b = [0u8; 8];
        b.copy_from_slice(bytes);
        i64::from_le_bytes(b)
    }

    fn write_le_bytes(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.to_le_bytes());
    }
}

/// Pointer-valued fields: a point is its coordinates, packed in dimension
/// order.
impl<const N: usize, T: Coord + FieldValue> FieldValue for Point<N, T> {
    const SIZE: usize = N * T::SIZE;

    fn from_le_bytes(bytes: &[u8]) -> Self {
        let mut coords = [T::ZERO; N];
        for (d, c) in coords.iter_mut().enumerate() {
            *c = T::from_le_bytes(&bytes[d * T::SIZE..(d + 1) * T::SIZE]);
        }
        Point(coords)
    }

    fn write_le_bytes(&self, out: &mut [u8]) {
        for d in 0..N {
            self.0[d].write_le_bytes(&mut out[d * T::SIZE..(d + 1) * T::SIZE]);
        }
    }
}

/// O(1) reader for one descriptor. The layout is resolved at construction;
/// each read is an offset computation plus a bounded copy. Valid only while
/// the descriptor's instance is live (reads on a destroyed instance fail
/// with `InvalidDescriptor`).
pub struct FieldAccessor<'a, const N: usize, T: Coord, V: FieldValue> {
    source: &'a dyn InstanceSource,
    desc: &'a FieldDataDescriptor<N, T, V>,
    layout: AffineLayout<N>,
}

impl<'a, const N: usize, T: Coord, V: FieldValue> FieldAccessor<'a, N, T, V> {
    pub fn new(
        source: &'a dyn InstanceSource,
        desc: &'a FieldDataDescriptor<N, T, V>,
    ) -> Result<Self> {
        let layout = AffineLayout::contiguous(&desc.index_space.bounds, desc.field_offset, V::SIZE)?;
        Ok(FieldAccessor {
            source,
            desc,
            layout,
        })
    }

    /// Read the field value at `p`. `p` must lie within the descriptor's
    /// bounding rect.
    pub fn read(&self, p: &Point<N, T>) -> Result<V> {
        if !self.desc.index_space.bounds.contains_point(p) {
            return Err(Error::InvalidDescriptor(format!(
                "point {p} outside descriptor bounds {}",
                self.desc.index_space.bounds
            )));
        }
        let off = self.layout.offset_of(&self.desc.index_space.bounds.lo, p);
        let mut buf = [0u8; MAX_VALUE_SIZE];
        let buf = &mut buf[..V::SIZE];
        self.source.read_into(self.desc.instance, off, buf)?;
        Ok(V::from_le_bytes(buf))
    }

    /// Write the field value at `p`. Exposed for initialization code and
    /// tests; operators only read.
    pub fn write_via(&self, store: &crate::HeapInstances, p: &Point<N, T>, v: V) -> Result<()> {
        let off = self.layout.offset_of(&self.desc.index_space.bounds.lo, p);
        let mut buf = [0u8; MAX_VALUE_SIZE];
        let buf = &mut buf[..V::SIZE];
        v.write_le_bytes(buf);
        store.write(self.desc.instance, off, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeapInstances;
    use partwise_core::rect::Rect;
    use partwise_space::IndexSpace;

    #[test]
    fn int_field_round_trip() {
        let store = HeapInstances::new();
        let space: IndexSpace<1, i64> = Rect::new([0], [7]).into();
        let inst = store.create_instance(8, &[4]);
        let desc: FieldDataDescriptor<1, i64, i32> = FieldDataDescriptor::new(space, inst, 0);
        let acc = FieldAccessor::new(&store, &desc).unwrap();
        for i in 0..8 {
            acc.write_via(&store, &Point::new([i]), (i * 10) as i32).unwrap();
        }
        assert_eq!(acc.read(&Point::new([3])).unwrap(), 30);
        assert_eq!(acc.read(&Point::new([7])).unwrap(), 70);
    }

    #[test]
    fn pointer_field_round_trip() {
        let store = HeapInstances::new();
        let space: IndexSpace<1, i64> = Rect::new([0], [3]).into();
        let inst = store.create_instance(4, &[Point::<1, i64>::SIZE]);
        let desc: FieldDataDescriptor<1, i64, Point<1, i64>> =
            FieldDataDescriptor::new(space, inst, 0);
        let acc = FieldAccessor::new(&store, &desc).unwrap();
        acc.write_via(&store, &Point::new([2]), Point::new([55])).unwrap();
        assert_eq!(acc.read(&Point::new([2])).unwrap(), Point::new([55]));
    }

    #[test]
    fn out_of_bounds_point_rejected() {
        let store = HeapInstances::new();
        let space: IndexSpace<1, i64> = Rect::new([0], [3]).into();
        let inst = store.create_instance(4, &[4]);
        let desc: FieldDataDescriptor<1, i64, i32> = FieldDataDescriptor::new(space, inst, 0);
        let acc = FieldAccessor::new(&store, &desc).unwrap();
        assert!(acc.read(&Point::new([9])).is_err());
    }

    #[test]
    fn two_fields_do_not_alias() {
        let store = HeapInstances::new();
        let space: IndexSpace<1, i64> = Rect::new([0], [3]).into();
        let inst = store.create_instance(4, &[8, 8]);
        let d0: FieldDataDescriptor<1, i64, i64> =
            FieldDataDescriptor::new(space.clone(), inst, 0);
        let d1: FieldDataDescriptor<1, i64, i64> = FieldDataDescriptor::new(space, inst, 8);
        let a0 = FieldAccessor::new(&store, &d0).unwrap();
        let a1 = FieldAccessor::new(&store, &d1).unwrap();
        a0.write_via(&store, &Point::new([1]), 111).unwrap();
        a1.write_via(&store, &Point::new([1]), 222).unwrap();
        assert_eq!(a0.read(&Point::new([1])).unwrap(), 111);
        assert_eq!(a1.read(&Point::new([1])).unwrap(), 222);
    }
}
