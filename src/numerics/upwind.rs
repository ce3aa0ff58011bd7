//! First-order upwind flux for a passive scalar.

use crate::geometry::metrics::{add, dot, scale};
use crate::numerics::{ConvectiveInput, ConvectiveNumerics, FluxResult};

/// Upwind on the face-averaged volume flux `q = ½(v_i + v_j)·n`.
#[derive(Copy, Clone, Debug, Default)]
pub struct ScalarUpwind;

impl ConvectiveNumerics for ScalarUpwind {
    fn compute(&self, input: &ConvectiveInput) -> FluxResult {
        let [vi, vj] = [input.primitive[0].velocity, input.primitive[1].velocity];
        let q = dot(scale(add(vi, vj), 0.5), input.normal);
        let a0 = 0.5 * (q + q.abs());
        let a1 = 0.5 * (q - q.abs());
        FluxResult {
            residual: a0 * input.temperature[0] + a1 * input.temperature[1],
            jacobian_i: a0,
            jacobian_j: a1,
        }
    }
}
