//! `PointId`: a strong, zero-cost handle for dual-mesh points
//!
//! Points are stored in flat arenas (coordinates, volumes, field values) and
//! addressed by their *local* index on the current partition. `PointId`
//! wraps that index so it cannot be confused with a global index, an edge
//! index or a vertex position inside a boundary marker.

use std::fmt;

/// Local index of a point on this partition.
///
/// # Memory layout
/// This type is `repr(transparent)` over `u32` and can be packed into
/// communication buffers exactly like a `u32`.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
    bytemuck::Pod,
    bytemuck::Zeroable,
)]
#[repr(transparent)]
pub struct PointId(u32);

impl PointId {
    /// Creates a new `PointId` from a local arena index.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not fit in `u32`.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use mesh_heat::topology::point::PointId;
    /// let p = PointId::new(3);
    /// assert_eq!(p.index(), 3);
    /// ```
    #[inline]
    pub fn new(index: usize) -> Self {
        PointId(u32::try_from(index).expect("point index exceeds u32 range"))
    }

    /// Returns the arena index of this point.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<PointId> for usize {
    #[inline]
    fn from(p: PointId) -> usize {
        p.index()
    }
}

// -----------------------------------------------------------------------------
// Formatting traits
// -----------------------------------------------------------------------------

impl fmt::Debug for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PointId").field(&self.0).finish()
    }
}

/// Prints only the raw index.
impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// -----------------------------------------------------------------------------
// FFI and layout guarantees
// -----------------------------------------------------------------------------

/// `PointId` can be sent over MPI as a `u32`.
#[cfg(feature = "mpi-support")]
unsafe impl mpi::datatype::Equivalence for PointId {
    type Out = <u32 as mpi::datatype::Equivalence>::Out;

    fn equivalent_datatype() -> Self::Out {
        u32::equivalent_datatype()
    }
}
