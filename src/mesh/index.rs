//! Index types for mesh elements.
//!
//! Vertices, half-edges, edges and faces live in flat arrays inside
//! [`HalfEdgeMesh`](super::HalfEdgeMesh); these wrappers keep the four index
//! spaces apart at compile time. The underlying integer is chosen through
//! [`MeshIndex`] (`u32` by default, `u64` for very large meshes).

use std::fmt::{self, Debug};
use std::hash::Hash;

/// Integer types usable as mesh indices.
pub trait MeshIndex: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {
    /// Sentinel used for "no element" (a ghost half-edge's face, for instance).
    const INVALID: Self;

    /// Convert from `usize`.
    ///
    /// # Panics
    /// Debug builds panic if the value does not fit.
    fn from_usize(v: usize) -> Self;

    /// Convert to `usize`.
    fn to_usize(self) -> usize;

    /// `false` for the sentinel.
    #[inline]
    fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl MeshIndex for u32 {
    const INVALID: Self = u32::MAX;

    #[inline]
    fn from_usize(v: usize) -> Self {
        debug_assert!(v < u32::MAX as usize, "index {} too large for u32", v);
        v as u32
    }

    #[inline]
    fn to_usize(self) -> usize {
        self as usize
    }
}

impl MeshIndex for u64 {
    const INVALID: Self = u64::MAX;

    #[inline]
    fn from_usize(v: usize) -> Self {
        v as u64
    }

    #[inline]
    fn to_usize(self) -> usize {
        self as usize
    }
}

/// Vertex index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct VertexId<I: MeshIndex = u32>(I);

/// Half-edge index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct HalfEdgeId<I: MeshIndex = u32>(I);

/// Face index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct FaceId<I: MeshIndex = u32>(I);

/// Undirected edge index. Both half-edges of an edge share it.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct EdgeId<I: MeshIndex = u32>(I);

macro_rules! impl_index_type {
    ($name:ident, $display:literal) => {
        impl<I: MeshIndex> $name<I> {
            /// Wrap a raw array position.
            #[inline]
            pub fn new(index: usize) -> Self {
                Self(I::from_usize(index))
            }

            /// The "no element" sentinel.
            #[inline]
            pub fn invalid() -> Self {
                Self(I::INVALID)
            }

            /// Array position.
            #[inline]
            pub fn index(self) -> usize {
                self.0.to_usize()
            }

            /// `false` for the sentinel.
            #[inline]
            pub fn is_valid(self) -> bool {
                self.0.is_valid()
            }
        }

        impl<I: MeshIndex> Debug for $name<I> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", $display, self.index())
                } else {
                    write!(f, "{}(INVALID)", $display)
                }
            }
        }

        impl<I: MeshIndex> Default for $name<I> {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl<I: MeshIndex> From<usize> for $name<I> {
            fn from(v: usize) -> Self {
                Self::new(v)
            }
        }
    };
}

impl_index_type!(VertexId, "V");
impl_index_type!(HalfEdgeId, "HE");
impl_index_type!(FaceId, "F");
impl_index_type!(EdgeId, "E");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_sentinel() {
        let e: EdgeId = EdgeId::new(7);
        assert_eq!(e.index(), 7);
        assert!(e.is_valid());
        assert!(!EdgeId::<u32>::invalid().is_valid());
        assert!(!FaceId::<u64>::default().is_valid());
    }

    #[test]
    fn test_debug_format() {
        let he: HalfEdgeId = HalfEdgeId::new(3);
        assert_eq!(format!("{:?}", he), "HE(3)");
        let f: FaceId = FaceId::invalid();
        assert_eq!(format!("{:?}", f), "F(INVALID)");
    }
}
