//! HeatError: Unified error type for mesh-heat public APIs
//!
//! Every fallible solver operation (construction, restart reading, halo
//! exchange, the linear solve) reports through this enum so callers can
//! propagate with `?` instead of aborting.

use thiserror::Error;

/// Unified error type for mesh-heat operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HeatError {
    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A marker tag was requested that the mesh does not define.
    #[error("unknown boundary marker `{0}`")]
    UnknownMarker(String),
    /// The mesh carries a marker for which no boundary condition was configured.
    #[error("no boundary condition configured for marker `{0}`")]
    MissingMarkerConfig(String),
    /// A point index is outside the local point range.
    #[error("point index {point} out of range (mesh has {len} points)")]
    PointOutOfRange { point: usize, len: usize },
    /// Malformed mesh geometry (edges, normals, neighbours).
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    /// Flow-coupled mode was selected but no flow field was supplied.
    #[error("flow-coupled heat solver requires a flow field")]
    MissingFlowField,
    /// The supplied flow field does not match the mesh size.
    #[error("flow field has {got} points, mesh has {expected}")]
    FlowFieldSizeMismatch { expected: usize, got: usize },
    /// Conjugate variable access with a bad marker or vertex index.
    #[error("conjugate variable index out of range: marker {marker}, vertex {vertex}")]
    ConjugateIndex { marker: usize, vertex: usize },
    /// Missing or corrupt restart file; fatal at start-up.
    #[error("startup failure: {0}")]
    StartupFailure(String),
    /// The linear solver produced an unusable increment.
    #[error("linear solve failed: {0}")]
    LinearSolve(String),
    /// Point-to-point or collective communication failed.
    #[error("communication with rank {neighbor} failed: {reason}")]
    CommError { neighbor: usize, reason: String },
    /// A halo buffer arrived with the wrong length.
    #[error("halo buffer from rank {neighbor}: expected {expected} bytes, got {got}")]
    HaloSizeMismatch {
        neighbor: usize,
        expected: usize,
        got: usize,
    },
}
