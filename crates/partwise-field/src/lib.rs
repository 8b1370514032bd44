#![forbid(unsafe_code)]
//! partwise-field: read-only views over field data in region instances.
//!
//! The engine never allocates or owns field storage; it reads through an
//! [`InstanceSource`] seam. This crate provides:
//! - `AffineLayout`: explicit base/stride/element layout, resolved once per
//!   accessor,
//! - `FieldDataDescriptor`: the `{index_space, instance, field_offset}`
//!   triple operators take as input,
//! - `FieldAccessor`: the O(1) `point -> value` reader,
//! - `HeapInstances`: an in-memory instance store for initialization code
//!   and tests.
//!
//! Field data must not be mutated for the lifetime of any operator that
//! names it; initialization completion events feed operator preconditions.

pub mod accessor;
pub mod instance;
pub mod layout;

pub use accessor::{FieldAccessor, FieldValue};
pub use instance::{HeapInstances, InstanceSource};
pub use layout::AffineLayout;

use partwise_core::id::InstanceId;
use partwise_core::point::Coord;
use partwise_space::IndexSpace;

use std::marker::PhantomData;

/// Names a field of a region instance over an index space. The descriptor's
/// space tells the operator which points the instance covers; `field_offset`
/// is the byte offset of the field within the instance's per-element field
/// tuple.
#[derive(Clone, Debug)]
pub struct FieldDataDescriptor<const N: usize, T: Coord, V> {
    pub index_space: IndexSpace<N, T>,
    pub instance: InstanceId,
    pub field_offset: usize,
    _value: PhantomData<fn() -> V>,
}

impl<const N: usize, T: Coord, V> FieldDataDescriptor<N, T, V> {
    pub fn new(index_space: IndexSpace<N, T>, instance: InstanceId, field_offset: usize) -> Self {
        FieldDataDescriptor {
            index_space,
            instance,
            field_offset,
            _value: PhantomData,
        }
    }
}
