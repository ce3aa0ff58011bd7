//! Sparse storage and iterative solvers for the implicit update.

pub mod solver;
pub mod sparse;

pub use solver::{BiCgStab, JacobiPreconditioner, LinearSolver, Preconditioner, SolveReport, SolverStatus};
pub use sparse::{CsrPattern, SparseMatrix};
