//! Solution update: implicit and explicit Euler, dual-time source and
//! residual diagnostics.

use itertools::izip;

use crate::algs::communicator::Communicator;
use crate::algs::halo::HaloPayload;
use crate::config::TimeMarching;
use crate::data::flow::FlowField;
use crate::geometry::metrics::Vec3;
use crate::heat_error::HeatError;
use crate::linalg::solver::SolveReport;
use crate::solver::HeatSolver;
use crate::topology::mesh::DualMesh;
use crate::topology::point::PointId;

/// Lower bound on the reported RMS residual.
const RMS_FLOOR: f64 = 1e-32;

/// Global residual norms of one iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct ResidualReport {
    /// `sqrt(Σ R² / N_global)` over owned points.
    pub rms: f64,
    /// Largest `|R|` over owned points.
    pub max: f64,
    /// Global index of the point holding `max`.
    pub max_point: usize,
    pub max_coord: Vec3,
}

/// Per-partition accumulator for [`ResidualReport`].
#[derive(Clone, Debug, Default)]
struct ResidualStats {
    sum_sq: f64,
    max: f64,
    max_point: usize,
    max_coord: Vec3,
}

impl ResidualStats {
    fn add(&mut self, mesh: &DualMesh, p: PointId, r: f64) {
        self.sum_sq += r * r;
        if r.abs() > self.max {
            let point = mesh.point(p);
            self.max = r.abs();
            self.max_point = point.global_index;
            self.max_coord = point.coord;
        }
    }

    /// Reduce across partitions; ties on the maximum go to the lowest rank.
    fn reduce<C: Communicator>(
        self,
        mesh: &DualMesh,
        comm: &C,
    ) -> Result<ResidualReport, HeatError> {
        let total = comm.all_reduce_sum(self.sum_sq)?;
        let n = mesh.global_domain_points().max(1) as f64;
        let rms = (total / n).sqrt().max(RMS_FLOOR);

        let local = [
            self.max,
            self.max_point as f64,
            self.max_coord[0],
            self.max_coord[1],
            self.max_coord[2],
        ];
        let mut report = ResidualReport {
            rms,
            max: 0.0,
            max_point: 0,
            max_coord: [0.0; 3],
        };
        for entry in comm.all_gather_f64(&local)? {
            if let [max, point, x, y, z] = entry[..] {
                if max > report.max {
                    report.max = max;
                    report.max_point = point as usize;
                    report.max_coord = [x, y, z];
                }
            }
        }
        Ok(report)
    }
}

impl HeatSolver {
    /// Add the physical-time derivative of the dual-time scheme.
    ///
    /// No-op for steady and time-stepping runs.
    pub fn set_residual_dual_time(&mut self, mesh: &DualMesh) {
        let dt = self.config.unsteady_time_step;
        let implicit = self.config.is_implicit();
        let (weights, diag) = match self.config.time_marching {
            TimeMarching::DualTime1st => ([1.0, -1.0, 0.0], 1.0),
            TimeMarching::DualTime2nd => ([1.5, -2.0, 0.5], 1.5),
            TimeMarching::Steady | TimeMarching::TimeStepping => return,
        };

        let field = &self.field;
        for p in mesh.point_ids().filter(|&p| mesh.is_domain(p)) {
            let k = p.index();
            let volume = mesh.volume(p);
            let dudt = weights[0] * field.solution[k]
                + weights[1] * field.time_n[k]
                + weights[2] * field.time_n1[k];
            self.residual[k] += dudt * volume / dt;
            if implicit {
                self.jacobian.add_val_to_diag(p, diag * volume / dt);
            }
        }
    }

    /// Shift the stored time levels after a converged physical step.
    pub fn push_time_levels(&mut self) {
        self.field.push_time_levels();
    }

    /// Solve `(V/Δt + J)·ΔT = −R`, apply `ΔT` and refresh ghosts.
    ///
    /// Ghost rows are replaced by identity rows with a zero right-hand side,
    /// so the coupling between partitions is lagged to the next iteration.
    pub fn implicit_euler_iteration<C: Communicator>(
        &mut self,
        mesh: &DualMesh,
        flow: Option<&FlowField>,
        comm: &C,
    ) -> Result<(ResidualReport, SolveReport), HeatError> {
        let mut stats = ResidualStats::default();
        let cfl_reduction = self.config.cfl_reduction_turb;

        for p in mesh.point_ids() {
            let k = p.index();
            if !mesh.is_domain(p) {
                self.rhs[k] = 0.0;
                self.increment[k] = 0.0;
                self.jacobian.set_identity_row(p);
                continue;
            }

            let volume = mesh.volume(p);
            let dt = self.field.delta_time[k];
            let mut delta = if dt > 0.0 && volume > 0.0 {
                volume / dt
            } else {
                0.0
            };
            if let Some(flow) = flow {
                let flow_dt = flow.delta_time(p);
                if flow_dt > 0.0 {
                    delta = delta.min(volume / (cfl_reduction * flow_dt));
                }
            }
            self.jacobian.add_val_to_diag(p, delta);

            let r = self.residual[k];
            self.rhs[k] = -r;
            self.increment[k] = 0.0;
            stats.add(mesh, p, r);
        }

        let report = self
            .linear_solver
            .solve(&self.jacobian, &self.rhs, &mut self.increment)?;
        if !report.is_converged() {
            log::warn!(
                "{}: {:?} after {} iterations (residual {:.3e}, initial {:.3e})",
                self.linear_solver.name(),
                report.status,
                report.iterations,
                report.residual_norm,
                report.initial_residual_norm
            );
        }

        for (p, t, dt) in izip!(mesh.point_ids(), &mut self.field.solution, &self.increment) {
            if mesh.is_domain(p) {
                *t += dt;
            }
        }
        self.exchange_halo(mesh, HaloPayload::Solution, comm)?;

        Ok((stats.reduce(mesh, comm)?, report))
    }

    /// `T ← T − Δt/V·R` on owned points, then refresh ghosts.
    pub fn explicit_euler_iteration<C: Communicator>(
        &mut self,
        mesh: &DualMesh,
        comm: &C,
    ) -> Result<ResidualReport, HeatError> {
        let mut stats = ResidualStats::default();
        self.field.set_old_solution();

        for p in mesh.point_ids().filter(|&p| mesh.is_domain(p)) {
            let k = p.index();
            let r = self.residual[k];
            stats.add(mesh, p, r);

            let volume = mesh.volume(p);
            let dt = self.field.delta_time[k];
            if dt != 0.0 && volume > 0.0 {
                self.field.solution[k] -= dt / volume * r;
            }
        }
        self.exchange_halo(mesh, HaloPayload::Solution, comm)?;

        stats.reduce(mesh, comm)
    }
}
