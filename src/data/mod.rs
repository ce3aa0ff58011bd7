//! Data module: per-point solver state and coupling inputs.

pub mod conjugate;
pub mod field;
pub mod flow;

pub use conjugate::{ConjugateVar, ConjugateVariables};
pub use field::HeatField;
pub use flow::{FlowField, FlowGradient, FlowPrimitive};
