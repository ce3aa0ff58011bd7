#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-heat
//!
//! mesh-heat is an edge-based finite-volume solver for a scalar temperature
//! field on partitioned, unstructured dual meshes. It runs either as pure
//! solid conduction or as a passive scalar carried by an externally computed
//! flow, and exchanges interface data with a partner zone for conjugate heat
//! transfer.
//!
//! ## Features
//! - Flat-arena dual mesh ([`topology::DualMesh`]) with edges, boundary
//!   markers and halo links
//! - Pluggable convective and viscous numerics, Green-Gauss and weighted
//!   least-squares gradients
//! - Isothermal, heat-flux, inlet, outlet and conjugate-interface boundaries
//! - Local time stepping with implicit (BiCGStab) or explicit Euler updates,
//!   and dual-time stepping for unsteady runs
//! - Pluggable communication backends (serial, in-process threads, MPI) for
//!   halo exchange and global reductions
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! mesh-heat = "0.3"
//! # Optional features:
//! # features = ["mpi-support", "rayon"]
//! ```
//!
//! A minimal conduction run:
//!
//! ```rust
//! use mesh_heat::prelude::*;
//!
//! let mut b = MeshBuilder::new(2);
//! let p0 = b.point([0.0, 0.0, 0.0], 0.5);
//! let p1 = b.point([1.0, 0.0, 0.0], 0.5);
//! b.edge(p0, p1, [1.0, 0.0, 0.0]);
//! b.marker("hot", vec![BoundaryVertex { point: p0, normal: [1.0, 0.0, 0.0], normal_neighbor: p1 }]);
//! let mesh = b.build()?;
//!
//! let mut config = HeatConfig::default();
//! config.markers = vec![MarkerConfig::new("hot", BoundaryKind::HeatFlux { flux: 1.0 })];
//!
//! let mut solver = HeatSolver::new(&mesh, config)?;
//! let report = solver.iterate(&mesh, None, &NoComm)?;
//! assert!(report.residual.rms > 0.0);
//! # Ok::<(), mesh_heat::heat_error::HeatError>(())
//! ```
//!
//! ## Logging
//! The crate emits records through the `log` facade and never installs a
//! logger; the embedding application chooses one.

pub mod algs;
pub mod config;
pub mod data;
pub mod geometry;
pub mod heat_error;
pub mod linalg;
pub mod numerics;
pub mod solver;
pub mod topology;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, NoComm, RayonComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::halo::HaloPayload;
    pub use crate::config::{
        BoundaryKind, GradientMethod, HeatConfig, MarkerConfig, SolverMode, TimeIntegration,
        TimeMarching,
    };
    pub use crate::data::{ConjugateVar, FlowField, FlowPrimitive, HeatField};
    pub use crate::heat_error::HeatError;
    pub use crate::linalg::{BiCgStab, LinearSolver};
    pub use crate::solver::{HeatSolver, IterationReport};
    pub use crate::topology::{BoundaryVertex, DualMesh, MeshBuilder, PointId};
}
