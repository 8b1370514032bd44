//! Integer points of fixed dimensionality.
//!
//! `Point<N, T>` is a tuple of N coordinates of scalar type T. The engine is
//! generic over both; `Coord` is the capability set a scalar must provide.
//! Coordinate arithmetic is checked: overflow surfaces as `Error::Overflow`
//! instead of wrapping.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::ops::{Index, IndexMut};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Scalar coordinate types usable in points and rects.
///
/// Implemented for `i32` and `i64`. Signed-ness is load-bearing: the canonical
/// empty rect is `[0, -1]`.
pub trait Coord:
    Copy
    + Ord
    + Eq
    + Hash
    + fmt::Debug
    + fmt::Display
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    const ZERO: Self;
    const ONE: Self;
    const NEG_ONE: Self;
    const MIN: Self;
    const MAX: Self;

    fn checked_add(self, rhs: Self) -> Option<Self>;
    fn checked_sub(self, rhs: Self) -> Option<Self>;

    /// Widen to i64 (lossless for all supported scalars).
    fn to_i64(self) -> i64;

    /// Narrow from i64, `None` if out of range.
    fn from_i64(v: i64) -> Option<Self>;
}

macro_rules! impl_coord {
    ($t:ty) => {
        impl Coord for $t {
            const ZERO: Self = 0;
            const ONE: Self = 1;
            const NEG_ONE: Self = -1;
            const MIN: Self = <$t>::MIN;
            const MAX: Self = <$t>::MAX;

            fn checked_add(self, rhs: Self) -> Option<Self> {
                <$t>::checked_add(self, rhs)
            }
            fn checked_sub(self, rhs: Self) -> Option<Self> {
                <$t>::checked_sub(self, rhs)
            }
            fn to_i64(self) -> i64 {
                self as i64
            }
            fn from_i64(v: i64) -> Option<Self> {
                <$t>::try_from(v).ok()
            }
        }
    };
}

impl_coord!(i32);
impl_coord!(i64);

/// An immutable tuple of N integer coordinates.
///
/// The derived `Ord` compares coordinate 0 first (array order). Scan order --
/// the order the rect iterator visits points, with dimension 0 varying
/// fastest -- is a different total order; see [`Point::scan_cmp`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point<const N: usize, T: Coord>(pub [T; N]);

// Serde impls are written by hand: the derive would need `[T; N]:
// Deserialize` for arbitrary N, which serde only provides for fixed sizes.
impl<const N: usize, T: Coord> Serialize for Point<N, T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeTuple;
        let mut tup = serializer.serialize_tuple(N)?;
        for c in &self.0 {
            tup.serialize_element(c)?;
        }
        tup.end()
    }
}

impl<'de, const N: usize, T: Coord> Deserialize<'de> for Point<N, T> {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        struct TupleVisitor<const N: usize, T>(std::marker::PhantomData<T>);

        impl<'de, const N: usize, T: Coord> serde::de::Visitor<'de> for TupleVisitor<N, T> {
            type Value = Point<N, T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a tuple of {N} coordinates")
            }

            fn visit_seq<A: serde::de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<Point<N, T>, A::Error> {
                let mut coords = [T::ZERO; N];
                for (d, slot) in coords.iter_mut().enumerate() {
                    *slot = seq
                        .next_element()?
                        .ok_or_else(|| serde::de::Error::invalid_length(d, &self))?;
                }
                Ok(Point(coords))
            }
        }

        deserializer.deserialize_tuple(N, TupleVisitor(std::marker::PhantomData))
    }
}

impl<const N: usize, T: Coord> Point<N, T> {
    pub const DIM: usize = N;

    pub fn new(coords: [T; N]) -> Self {
        Point(coords)
    }

    pub fn zeroes() -> Self {
        Point([T::ZERO; N])
    }

    /// Componentwise checked addition.
    pub fn try_add(&self, rhs: &Self) -> Result<Self> {
        let mut out = self.0;
        for d in 0..N {
            out[d] = self.0[d].checked_add(rhs.0[d]).ok_or(Error::Overflow)?;
        }
        Ok(Point(out))
    }

    /// Componentwise checked subtraction.
    pub fn try_sub(&self, rhs: &Self) -> Result<Self> {
        let mut out = self.0;
        for d in 0..N {
            out[d] = self.0[d].checked_sub(rhs.0[d]).ok_or(Error::Overflow)?;
        }
        Ok(Point(out))
    }

    /// Compare in scan order: dimension N-1 is most significant, dimension 0
    /// least. This matches the fixed iteration order of [`crate::Rect`]
    /// (dimension 0 varies fastest).
    pub fn scan_cmp(&self, other: &Self) -> Ordering {
        for d in (0..N).rev() {
            match self.0[d].cmp(&other.0[d]) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl<const N: usize, T: Coord> Index<usize> for Point<N, T> {
    type Output = T;
    fn index(&self, d: usize) -> &T {
        &self.0[d]
    }
}

impl<const N: usize, T: Coord> IndexMut<usize> for Point<N, T> {
    fn index_mut(&mut self, d: usize) -> &mut T {
        &mut self.0[d]
    }
}

impl<const N: usize, T: Coord> From<[T; N]> for Point<N, T> {
    fn from(coords: [T; N]) -> Self {
        Point(coords)
    }
}

impl<T: Coord> From<T> for Point<1, T> {
    fn from(x: T) -> Self {
        Point([x])
    }
}

fn fmt_coords<const N: usize, T: Coord>(p: &Point<N, T>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "(")?;
    for d in 0..N {
        if d > 0 {
            write!(f, ",")?;
        }
        write!(f, "{}", p.0[d])?;
    }
    write!(f, ")")
}

impl<const N: usize, T: Coord> fmt::Debug for Point<N, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_coords(self, f)
    }
}

impl<const N: usize, T: Coord> fmt::Display for Point<N, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_coords(self, f)
    }
}
