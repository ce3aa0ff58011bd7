//! The heat solver context.
//!
//! [`HeatSolver`] owns the temperature field, the residual vector and the
//! Jacobian of one partition. The mesh, the flow field and the communicator
//! are borrowed per call, so a coupling driver can hand the same mesh to
//! several solvers.
//!
//! One pseudo-time iteration ([`HeatSolver::iterate`]):
//! 1. preprocessing: reset, refresh ghosts, reconstruct gradients;
//! 2. local time step;
//! 3. convective and viscous edge loops;
//! 4. boundary conditions;
//! 5. dual-time source (unsteady runs);
//! 6. implicit or explicit update, followed by a solution halo exchange;
//! 7. heat-flux monitoring.

pub mod assembly;
pub mod boundary;
pub mod implicit;
pub mod restart;
pub mod time_step;

use std::path::Path;

use crate::algs::communicator::Communicator;
use crate::algs::halo::{HaloPayload, exchange_field};
use crate::config::{GradientMethod, HeatConfig};
use crate::data::conjugate::{ConjugateVar, ConjugateVariables};
use crate::data::field::HeatField;
use crate::data::flow::FlowField;
use crate::heat_error::HeatError;
use crate::linalg::solver::{BiCgStab, LinearSolver, SolveReport};
use crate::linalg::sparse::SparseMatrix;
use crate::numerics::{
    ConvectiveNumerics, ViscousNumerics, convective_numerics, green_gauss, viscous_numerics,
    weighted_least_squares,
};
use crate::topology::mesh::DualMesh;

pub use boundary::{BoundaryCondition, InterfaceReport};
pub use implicit::ResidualReport;
pub use time_step::TimeStepRange;

/// Boundary behaviour bound to one mesh marker.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerBinding {
    pub condition: BoundaryCondition,
    /// Include this marker in heat-flux monitoring.
    pub monitoring: bool,
}

/// Heat flux through monitored markers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeatFluxReport {
    /// Local flux per mesh marker; zero for unmonitored markers.
    pub per_marker: Vec<f64>,
    /// Sum over monitored markers of every partition.
    pub total: f64,
}

/// Diagnostics of one [`HeatSolver::iterate`] call.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationReport {
    pub residual: ResidualReport,
    pub time_step: TimeStepRange,
    /// `None` for explicit updates.
    pub linear: Option<SolveReport>,
    pub heat_flux: HeatFluxReport,
}

/// Temperature solver state of one partition.
pub struct HeatSolver {
    config: HeatConfig,
    field: HeatField,
    conjugate: ConjugateVariables,
    residual: Vec<f64>,
    rhs: Vec<f64>,
    increment: Vec<f64>,
    jacobian: SparseMatrix,
    convective: Box<dyn ConvectiveNumerics>,
    viscous: Box<dyn ViscousNumerics>,
    linear_solver: Box<dyn LinearSolver>,
    boundaries: Vec<MarkerBinding>,
    interface_reports: Vec<Option<InterfaceReport>>,
}

impl HeatSolver {
    /// Solver with a uniform zero initial temperature.
    pub fn new(mesh: &DualMesh, config: HeatConfig) -> Result<Self, HeatError> {
        Self::with_solution(mesh, config, vec![0.0; mesh.n_points()])
    }

    /// Solver starting from the given per-point temperatures.
    pub fn with_solution(
        mesh: &DualMesh,
        config: HeatConfig,
        solution: Vec<f64>,
    ) -> Result<Self, HeatError> {
        config.validate()?;
        if solution.len() != mesh.n_points() {
            return Err(HeatError::InvalidConfig(format!(
                "initial solution has {} values, mesh has {} points",
                solution.len(),
                mesh.n_points()
            )));
        }
        let boundaries = bind_markers(mesh, &config)?;
        let n = mesh.n_points();

        log::info!(
            "heat solver: {:?} mode, {} points ({} owned), {} edges, {} markers, {:?}",
            config.mode,
            n,
            mesh.n_domain_points(),
            mesh.edges().len(),
            boundaries.len(),
            config.time_integration,
        );

        Ok(Self {
            field: HeatField::from_solution(solution),
            conjugate: ConjugateVariables::new(mesh, 0.0),
            residual: vec![0.0; n],
            rhs: vec![0.0; n],
            increment: vec![0.0; n],
            jacobian: SparseMatrix::from_mesh(mesh),
            convective: convective_numerics(&config),
            viscous: viscous_numerics(&config),
            linear_solver: Box::new(BiCgStab::new(config.linear_solver.clone())),
            interface_reports: vec![None; mesh.markers().len()],
            boundaries,
            config,
        })
    }

    /// Solver initialised from a restart file.
    pub fn from_restart(
        path: impl AsRef<Path>,
        mesh: &DualMesh,
        config: HeatConfig,
    ) -> Result<Self, HeatError> {
        let solution = restart::read_restart(path, mesh, &config)?;
        Self::with_solution(mesh, config, solution)
    }

    /// Replace the default BiCGStab solver.
    pub fn with_linear_solver(mut self, solver: Box<dyn LinearSolver>) -> Self {
        self.linear_solver = solver;
        self
    }

    /// Replace the numerics selected from the configuration.
    pub fn with_numerics(
        mut self,
        convective: Box<dyn ConvectiveNumerics>,
        viscous: Box<dyn ViscousNumerics>,
    ) -> Self {
        self.convective = convective;
        self.viscous = viscous;
        self
    }

    #[inline]
    pub fn config(&self) -> &HeatConfig {
        &self.config
    }

    #[inline]
    pub fn field(&self) -> &HeatField {
        &self.field
    }

    #[inline]
    pub fn field_mut(&mut self) -> &mut HeatField {
        &mut self.field
    }

    #[inline]
    pub fn residual(&self) -> &[f64] {
        &self.residual
    }

    #[inline]
    pub fn jacobian(&self) -> &SparseMatrix {
        &self.jacobian
    }

    pub fn boundaries(&self) -> &[MarkerBinding] {
        &self.boundaries
    }

    /// Report of the last boundary pass for a conjugate interface marker.
    pub fn interface_report(&self, marker: usize) -> Option<&InterfaceReport> {
        self.interface_reports.get(marker).and_then(Option::as_ref)
    }

    pub fn set_conjugate_variable(
        &mut self,
        marker: usize,
        vertex: usize,
        var: ConjugateVar,
        value: f64,
    ) -> Result<(), HeatError> {
        self.conjugate.set(marker, vertex, var, value)
    }

    pub fn conjugate_variable(
        &self,
        marker: usize,
        vertex: usize,
        var: ConjugateVar,
    ) -> Result<f64, HeatError> {
        self.conjugate.get(marker, vertex, var)
    }

    /// Refresh ghost values of one payload.
    pub fn exchange_halo<C: Communicator>(
        &mut self,
        mesh: &DualMesh,
        payload: HaloPayload,
        comm: &C,
    ) -> Result<(), HeatError> {
        exchange_field(mesh, &mut self.field, payload, comm)
    }

    /// Reset the system, refresh ghost temperatures and reconstruct gradients.
    pub fn preprocessing<C: Communicator>(
        &mut self,
        mesh: &DualMesh,
        comm: &C,
    ) -> Result<(), HeatError> {
        self.reset_residual_and_jacobian();
        self.exchange_halo(mesh, HaloPayload::Solution, comm)?;
        match self.config.gradient {
            GradientMethod::GreenGauss => {
                green_gauss(mesh, &self.field.solution, &mut self.field.gradient)
            }
            GradientMethod::WeightedLeastSquares => {
                weighted_least_squares(mesh, &self.field.solution, &mut self.field.gradient)
            }
        }
        self.exchange_halo(mesh, HaloPayload::Gradient, comm)
    }

    /// Assemble the residual and Jacobian without updating the solution.
    pub fn compute_residual<C: Communicator>(
        &mut self,
        mesh: &DualMesh,
        flow: Option<&FlowField>,
        comm: &C,
    ) -> Result<(), HeatError> {
        let flow = self.resolve_flow(mesh, flow)?;
        self.preprocessing(mesh, comm)?;
        self.assemble_edges(mesh, flow);
        self.apply_boundary_conditions(mesh, flow)?;
        if self.config.time_marching.is_dual_time() {
            self.set_residual_dual_time(mesh);
        }
        Ok(())
    }

    /// Run one pseudo-time iteration.
    pub fn iterate<C: Communicator>(
        &mut self,
        mesh: &DualMesh,
        flow: Option<&FlowField>,
        comm: &C,
    ) -> Result<IterationReport, HeatError> {
        let flow = self.resolve_flow(mesh, flow)?;
        self.compute_residual(mesh, flow, comm)?;
        let time_step = self.compute_time_step(mesh, flow, comm)?;

        let (residual, linear) = if self.config.is_implicit() {
            let (residual, linear) = self.implicit_euler_iteration(mesh, flow, comm)?;
            (residual, Some(linear))
        } else {
            (self.explicit_euler_iteration(mesh, comm)?, None)
        };
        log::trace!(
            "heat residual rms {:.6e}, max {:.6e} at point {}",
            residual.rms,
            residual.max,
            residual.max_point
        );

        let heat_flux = self.heat_fluxes(mesh, flow, comm)?;
        Ok(IterationReport {
            residual,
            time_step,
            linear,
            heat_flux,
        })
    }

    /// Flow data is mandatory in flow mode and ignored in conduction mode.
    fn resolve_flow<'f>(
        &self,
        mesh: &DualMesh,
        flow: Option<&'f FlowField>,
    ) -> Result<Option<&'f FlowField>, HeatError> {
        if !self.config.is_flow() {
            return Ok(None);
        }
        let flow = flow.ok_or(HeatError::MissingFlowField)?;
        flow.check_len(mesh.n_points())?;
        Ok(Some(flow))
    }
}

/// One binding per mesh marker, in mesh marker order.
fn bind_markers(mesh: &DualMesh, config: &HeatConfig) -> Result<Vec<MarkerBinding>, HeatError> {
    for marker in &config.markers {
        if mesh.marker_index(&marker.tag).is_err() {
            log::debug!("marker `{}` is not present on this partition", marker.tag);
        }
    }
    mesh.markers()
        .iter()
        .map(|marker| {
            let cfg = config
                .marker(marker.tag())
                .ok_or_else(|| HeatError::MissingMarkerConfig(marker.tag().to_string()))?;
            Ok(MarkerBinding {
                condition: BoundaryCondition::from_config(&cfg.kind, config),
                monitoring: cfg.monitoring,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::config::{BoundaryKind, MarkerConfig, SolverMode};
    use crate::topology::mesh::{BoundaryVertex, MeshBuilder};

    fn two_points(tag: &str) -> DualMesh {
        let mut b = MeshBuilder::new(2);
        let p0 = b.point([0.0; 3], 0.5);
        let p1 = b.point([1.0, 0.0, 0.0], 0.5);
        b.edge(p0, p1, [1.0, 0.0, 0.0]);
        b.marker(
            tag,
            vec![BoundaryVertex {
                point: p0,
                normal: [1.0, 0.0, 0.0],
                normal_neighbor: p1,
            }],
        );
        b.build().unwrap()
    }

    #[test]
    fn unconfigured_mesh_marker_is_rejected() {
        let mesh = two_points("wall");
        let err = HeatSolver::new(&mesh, HeatConfig::default()).err();
        assert_eq!(err, Some(HeatError::MissingMarkerConfig("wall".into())));
    }

    #[test]
    fn extra_config_markers_are_ignored() {
        let mesh = two_points("wall");
        let mut config = HeatConfig::default();
        config.markers = vec![
            MarkerConfig::new("wall", BoundaryKind::HeatFlux { flux: 1.0 }),
            MarkerConfig::new("elsewhere", BoundaryKind::Outlet),
        ];
        let solver = HeatSolver::new(&mesh, config).unwrap();
        assert_eq!(solver.boundaries().len(), 1);
        assert_eq!(solver.field().solution, vec![0.0, 0.0]);
    }

    #[test]
    fn flow_mode_requires_flow_field() {
        let mesh = two_points("wall");
        let mut config = HeatConfig::default();
        config.mode = SolverMode::Flow;
        config.markers = vec![MarkerConfig::new("wall", BoundaryKind::Outlet)];
        let mut solver = HeatSolver::new(&mesh, config).unwrap();
        assert_eq!(
            solver.iterate(&mesh, None, &NoComm).err(),
            Some(HeatError::MissingFlowField)
        );
        let short = FlowField::uniform(1, [0.0; 3], 1.0);
        assert!(matches!(
            solver.iterate(&mesh, Some(&short), &NoComm),
            Err(HeatError::FlowFieldSizeMismatch { .. })
        ));
    }

    #[test]
    fn conjugate_access_round_trips() {
        let mesh = two_points("interface");
        let mut config = HeatConfig::default();
        config.markers = vec![MarkerConfig::new(
            "interface",
            BoundaryKind::ConjugateInterface,
        )];
        let mut solver = HeatSolver::new(&mesh, config).unwrap();
        solver
            .set_conjugate_variable(0, 0, ConjugateVar::HeatFluxDensity, 2.5)
            .unwrap();
        assert_eq!(
            solver.conjugate_variable(0, 0, ConjugateVar::HeatFluxDensity),
            Ok(2.5)
        );
        assert!(solver
            .set_conjugate_variable(1, 0, ConjugateVar::Temperature, 1.0)
            .is_err());
    }

    #[test]
    fn wrong_initial_solution_length_is_rejected() {
        let mesh = two_points("wall");
        let mut config = HeatConfig::default();
        config.markers = vec![MarkerConfig::new("wall", BoundaryKind::Outlet)];
        assert!(matches!(
            HeatSolver::with_solution(&mesh, config, vec![1.0]),
            Err(HeatError::InvalidConfig(_))
        ));
    }
}
