//! Top-level module for dual-mesh topology.
//!
//! The heat solver never reads mesh files or partitions meshes itself; it
//! consumes a [`DualMesh`] built by the caller (see [`MeshBuilder`]).

pub mod mesh;
pub mod point;

pub use mesh::{BoundaryVertex, DualMesh, Edge, HaloLink, Marker, MeshBuilder, MeshPoint};
pub use point::PointId;
