//! Geometry utilities for mesh-heat.
//!
//! Vector arithmetic on `[f64; 3]` used by the edge loops, boundary handlers
//! and gradient reconstruction.

pub mod metrics;

pub use metrics::Vec3;
