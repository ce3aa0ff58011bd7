//! Flow-solver data consumed by the heat solver in coupled mode.
//!
//! The flow and turbulence solvers own these quantities; the heat solver only
//! reads them once per iteration.

use crate::geometry::metrics::{Vec3, add, dot};
use crate::heat_error::HeatError;
use crate::topology::point::PointId;

/// Flow primitive variables at a point or a reconstructed face state.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FlowPrimitive {
    pub pressure: f64,
    pub velocity: Vec3,
}

/// Spatial gradients of [`FlowPrimitive`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FlowGradient {
    pub pressure: Vec3,
    /// `velocity[d]` is the gradient of the `d`-th velocity component.
    pub velocity: [Vec3; 3],
}

impl FlowPrimitive {
    /// Linear extrapolation `q + ∇q · delta`.
    pub fn extrapolate(&self, grad: &FlowGradient, delta: Vec3) -> FlowPrimitive {
        let dv = [
            dot(grad.velocity[0], delta),
            dot(grad.velocity[1], delta),
            dot(grad.velocity[2], delta),
        ];
        FlowPrimitive {
            pressure: self.pressure + dot(grad.pressure, delta),
            velocity: add(self.velocity, dv),
        }
    }
}

/// Per-point flow inputs of one partition.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowField {
    primitives: Vec<FlowPrimitive>,
    gradients: Vec<FlowGradient>,
    eddy_viscosity: Vec<f64>,
    /// Local time step of the flow solver.
    delta_time: Vec<f64>,
}

impl FlowField {
    /// Assemble a flow field; every array must have the same length.
    pub fn new(
        primitives: Vec<FlowPrimitive>,
        gradients: Vec<FlowGradient>,
        eddy_viscosity: Vec<f64>,
        delta_time: Vec<f64>,
    ) -> Result<Self, HeatError> {
        let expected = primitives.len();
        for got in [gradients.len(), eddy_viscosity.len(), delta_time.len()] {
            if got != expected {
                return Err(HeatError::FlowFieldSizeMismatch { expected, got });
            }
        }
        Ok(Self {
            primitives,
            gradients,
            eddy_viscosity,
            delta_time,
        })
    }

    /// Laminar, uniform flow with zero gradients.
    pub fn uniform(n_points: usize, velocity: Vec3, delta_time: f64) -> Self {
        Self {
            primitives: vec![
                FlowPrimitive {
                    pressure: 0.0,
                    velocity,
                };
                n_points
            ],
            gradients: vec![FlowGradient::default(); n_points],
            eddy_viscosity: vec![0.0; n_points],
            delta_time: vec![delta_time; n_points],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Fail unless the field covers exactly `n_points` points.
    pub fn check_len(&self, n_points: usize) -> Result<(), HeatError> {
        if self.len() == n_points {
            Ok(())
        } else {
            Err(HeatError::FlowFieldSizeMismatch {
                expected: n_points,
                got: self.len(),
            })
        }
    }

    #[inline]
    pub fn primitive(&self, p: PointId) -> &FlowPrimitive {
        &self.primitives[p.index()]
    }

    #[inline]
    pub fn gradient(&self, p: PointId) -> &FlowGradient {
        &self.gradients[p.index()]
    }

    #[inline]
    pub fn eddy_viscosity(&self, p: PointId) -> f64 {
        self.eddy_viscosity[p.index()]
    }

    #[inline]
    pub fn delta_time(&self, p: PointId) -> f64 {
        self.delta_time[p.index()]
    }

    pub fn eddy_viscosity_mut(&mut self) -> &mut [f64] {
        &mut self.eddy_viscosity
    }

    pub fn primitives_mut(&mut self) -> &mut [FlowPrimitive] {
        &mut self.primitives
    }

    pub fn gradients_mut(&mut self) -> &mut [FlowGradient] {
        &mut self.gradients
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_lengths_rejected() {
        let err = FlowField::new(
            vec![FlowPrimitive::default(); 3],
            vec![FlowGradient::default(); 3],
            vec![0.0; 2],
            vec![1.0; 3],
        );
        assert_eq!(
            err,
            Err(HeatError::FlowFieldSizeMismatch {
                expected: 3,
                got: 2
            })
        );
    }

    #[test]
    fn extrapolation_is_linear() {
        let q = FlowPrimitive {
            pressure: 1.0,
            velocity: [1.0, 2.0, 0.0],
        };
        let g = FlowGradient {
            pressure: [2.0, 0.0, 0.0],
            velocity: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0; 3]],
        };
        let face = q.extrapolate(&g, [0.5, 0.25, 0.0]);
        assert_eq!(face.pressure, 2.0);
        assert_eq!(face.velocity, [1.5, 2.25, 0.0]);
    }

    #[test]
    fn check_len_reports_sizes() {
        let flow = FlowField::uniform(4, [1.0, 0.0, 0.0], 0.1);
        assert!(flow.check_len(4).is_ok());
        assert!(matches!(
            flow.check_len(5),
            Err(HeatError::FlowFieldSizeMismatch { expected: 5, got: 4 })
        ));
    }
}
