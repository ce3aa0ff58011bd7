//! Averaged-gradient diffusive fluxes.
//!
//! Both schemes use the mean diffusivity `D̄ = ½(D_i + D_j)` and the mean
//! gradient `ḡ = ½(∇T_i + ∇T_j)`. The Jacobian is the two-point part of
//! the corrected flux, `∓ D̄ · (e·n)/|e|²` with `e = x_j − x_i`.

use crate::geometry::metrics::{Vec3, add, dot, scale, sub};
use crate::numerics::{FluxResult, ViscousInput, ViscousNumerics};

/// `(e·n)/|e|²`, zero for coincident points.
fn edge_projection(input: &ViscousInput) -> (Vec3, f64) {
    let edge = sub(input.coords[1], input.coords[0]);
    let dist2 = dot(edge, edge);
    let proj = if dist2 == 0.0 {
        0.0
    } else {
        dot(edge, input.normal) / dist2
    };
    (edge, proj)
}

fn mean_diffusivity(input: &ViscousInput) -> f64 {
    0.5 * (input.diffusivity[0] + input.diffusivity[1])
}

fn mean_gradient(input: &ViscousInput) -> Vec3 {
    scale(add(input.gradient[0], input.gradient[1]), 0.5)
}

/// Mean gradient with the edge-direction component replaced by the
/// two-point difference.
#[derive(Copy, Clone, Debug, Default)]
pub struct AvgGradCorrected;

impl ViscousNumerics for AvgGradCorrected {
    fn compute(&self, input: &ViscousInput) -> FluxResult {
        let d_mean = mean_diffusivity(input);
        let (edge, proj) = edge_projection(input);
        let grad = mean_gradient(input);
        let jump = input.temperature[1] - input.temperature[0];
        let corrected = dot(grad, input.normal) - (dot(grad, edge) - jump) * proj;
        FluxResult {
            residual: d_mean * corrected,
            jacobian_i: -d_mean * proj,
            jacobian_j: d_mean * proj,
        }
    }
}

/// Mean gradient projected on the face normal only.
#[derive(Copy, Clone, Debug, Default)]
pub struct AvgGrad;

impl ViscousNumerics for AvgGrad {
    fn compute(&self, input: &ViscousInput) -> FluxResult {
        let d_mean = mean_diffusivity(input);
        let (_, proj) = edge_projection(input);
        FluxResult {
            residual: d_mean * dot(mean_gradient(input), input.normal),
            jacobian_i: -d_mean * proj,
            jacobian_j: d_mean * proj,
        }
    }
}
