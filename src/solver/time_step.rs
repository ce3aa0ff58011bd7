//! Local pseudo time step from the viscous spectral radius.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::algs::communicator::Communicator;
use crate::data::flow::FlowField;
use crate::heat_error::HeatError;
use crate::solver::HeatSolver;
use crate::topology::mesh::DualMesh;
use crate::topology::point::PointId;

/// Viscous stability constant.
const K_VISCOUS: f64 = 0.25;
/// Upper bound on the unclamped local step.
const MAX_LOCAL_STEP: f64 = 1e6;

/// Smallest and largest local time step over all partitions.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TimeStepRange {
    pub min: f64,
    pub max: f64,
}

/// `min(1e6, CFL·K_v·V²/λ)`, or `None` for ghosts and empty volumes.
fn local_step(volume: f64, lambda: f64, domain: bool, cfl: f64) -> Option<f64> {
    if !domain || volume == 0.0 {
        return None;
    }
    Some(MAX_LOCAL_STEP.min(cfl * K_VISCOUS * volume * volume / lambda))
}

impl HeatSolver {
    /// Compute `Δt` for every owned point and return the global range.
    ///
    /// Ghost points and zero-volume points get `Δt = 0`.
    pub fn compute_time_step<C: Communicator>(
        &mut self,
        mesh: &DualMesh,
        flow: Option<&FlowField>,
        comm: &C,
    ) -> Result<TimeStepRange, HeatError> {
        let config = &self.config;
        let diffusivity = |p: PointId| match flow {
            Some(flow) => config.flow_diffusivity(flow.eddy_viscosity(p)),
            None => config.solid.thermal_diffusivity(),
        };

        let lambda = &mut self.field.lambda_visc;
        lambda.fill(0.0);

        for edge in mesh.edges() {
            let (i, j) = (edge.tail(), edge.head());
            let area = edge.area();
            let l = diffusivity(i) * area * area;
            if mesh.is_domain(i) {
                lambda[i.index()] += l;
            }
            if mesh.is_domain(j) {
                lambda[j.index()] += l;
            }
        }

        for marker in mesh.markers() {
            for vertex in marker.vertices() {
                let p = vertex.point;
                if mesh.is_domain(p) {
                    let area = vertex.area();
                    lambda[p.index()] += diffusivity(p) * area * area;
                }
            }
        }

        let cfl = config.cfl;
        let lambda: &[f64] = lambda;
        let step = |k: usize| {
            let point = &mesh.points()[k];
            local_step(point.volume, lambda[k], point.domain, cfl)
        };
        #[cfg(feature = "rayon")]
        let steps: Vec<Option<f64>> = (0..mesh.n_points()).into_par_iter().map(step).collect();
        #[cfg(not(feature = "rayon"))]
        let steps: Vec<Option<f64>> = (0..mesh.n_points()).map(step).collect();

        let mut min = MAX_LOCAL_STEP;
        let mut max = 0.0_f64;
        for (dt, raw) in self.field.delta_time.iter_mut().zip(&steps) {
            *dt = match raw {
                Some(raw) => {
                    min = min.min(*raw);
                    max = max.max(*raw);
                    raw.min(config.max_delta_time)
                }
                None => 0.0,
            };
        }

        let range = TimeStepRange {
            min: comm.all_reduce_min(min)?,
            max: comm.all_reduce_max(max)?,
        };
        log::debug!("heat time step range [{:.6e}, {:.6e}]", range.min, range.max);
        Ok(range)
    }
}
