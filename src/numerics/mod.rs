//! Edge flux numerics for the temperature equation.
//!
//! A numerics object turns the state on both sides of a dual face into a
//! scalar flux and its derivatives with respect to the two temperatures.
//! Assembly decides where the result is added or subtracted.

pub mod gradient;
pub mod upwind;
pub mod viscous;

use crate::config::{ConvectiveScheme, HeatConfig, ViscousScheme};
use crate::data::flow::FlowPrimitive;
use crate::geometry::metrics::Vec3;

pub use gradient::{green_gauss, weighted_least_squares};
pub use upwind::ScalarUpwind;
pub use viscous::{AvgGrad, AvgGradCorrected};

/// Flux through one face and its 1×1 Jacobian blocks.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FluxResult {
    pub residual: f64,
    /// ∂residual/∂T_i
    pub jacobian_i: f64,
    /// ∂residual/∂T_j
    pub jacobian_j: f64,
}

/// Face state for a convective flux, `[i, j]` ordered.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ConvectiveInput {
    /// Face normal, oriented from i to j.
    pub normal: Vec3,
    pub temperature: [f64; 2],
    pub primitive: [FlowPrimitive; 2],
}

/// Face state for a diffusive flux, `[i, j]` ordered.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViscousInput {
    pub coords: [Vec3; 2],
    /// Face normal, oriented from i to j.
    pub normal: Vec3,
    pub gradient: [Vec3; 2],
    pub temperature: [f64; 2],
    pub diffusivity: [f64; 2],
}

pub trait ConvectiveNumerics: Send + Sync {
    fn compute(&self, input: &ConvectiveInput) -> FluxResult;
}

pub trait ViscousNumerics: Send + Sync {
    fn compute(&self, input: &ViscousInput) -> FluxResult;
}

/// Convective numerics selected by `config`.
pub fn convective_numerics(config: &HeatConfig) -> Box<dyn ConvectiveNumerics> {
    match config.convective {
        ConvectiveScheme::ScalarUpwind => Box::new(ScalarUpwind),
    }
}

/// Viscous numerics selected by `config`.
pub fn viscous_numerics(config: &HeatConfig) -> Box<dyn ViscousNumerics> {
    match config.viscous {
        ViscousScheme::AvgGradCorrected => Box::new(AvgGradCorrected),
        ViscousScheme::AvgGrad => Box::new(AvgGrad),
    }
}
