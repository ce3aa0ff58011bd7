//! Boundary conditions for the temperature equation.
//!
//! Each marker of the mesh is bound to one [`BoundaryCondition`]. For every
//! owned vertex, [`BoundaryCondition::apply`] returns the terms to
//! accumulate at that vertex's point; the solver performs the accumulation.
//! Nothing here mutates solver state.

use crate::algs::communicator::Communicator;
use crate::config::{BoundaryKind, HeatConfig};
use crate::data::conjugate::{ConjugateVar, ConjugateVariables};
use crate::data::field::HeatField;
use crate::data::flow::{FlowField, FlowPrimitive};
use crate::geometry::metrics::{Vec3, negate, scale};
use crate::heat_error::HeatError;
use crate::linalg::sparse::SparseMatrix;
use crate::numerics::{ConvectiveInput, ConvectiveNumerics};
use crate::solver::{HeatFluxReport, HeatSolver};
use crate::topology::mesh::{BoundaryVertex, DualMesh};
use crate::topology::point::PointId;

/// Per-marker boundary behaviour, with inputs already non-dimensional.
#[derive(Clone, Debug, PartialEq)]
pub enum BoundaryCondition {
    Isothermal { wall_temperature: f64 },
    /// Flux per unit area; divided by ρ·c_p in solid mode.
    HeatFlux { flux: f64 },
    Inlet { velocity: Vec3 },
    Outlet,
    ConjugateInterface,
}

impl BoundaryCondition {
    pub fn from_config(kind: &BoundaryKind, config: &HeatConfig) -> Self {
        match kind {
            BoundaryKind::Isothermal { temperature } => Self::Isothermal {
                wall_temperature: temperature / config.temperature_ref(),
            },
            BoundaryKind::HeatFlux { flux } => Self::HeatFlux {
                flux: if config.is_flow() {
                    *flux
                } else {
                    flux / config.solid.rho_cp()
                },
            },
            BoundaryKind::Inlet {
                velocity,
                direction,
            } => Self::Inlet {
                velocity: scale(*direction, velocity / config.velocity_ref),
            },
            BoundaryKind::Outlet => Self::Outlet,
            BoundaryKind::ConjugateInterface => Self::ConjugateInterface,
        }
    }
}

/// Whether a contribution is added to or subtracted from the point's row.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Accumulate {
    Add,
    Subtract,
}

/// A residual term and its optional diagonal Jacobian entry.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundaryContribution {
    pub residual: f64,
    pub jacobian: Option<f64>,
    pub mode: Accumulate,
}

/// Heat-transfer data observed at one conjugate interface vertex.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InterfaceSample {
    /// Imposed wall temperature (fluid side only).
    pub temperature: Option<f64>,
    pub heat_flux_density: f64,
    pub area: f64,
}

/// Everything a boundary vertex contributes.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BoundaryTerms {
    pub convective: Option<BoundaryContribution>,
    pub diffusive: Option<BoundaryContribution>,
    pub interface: Option<InterfaceSample>,
}

/// Per-marker summary of a conjugate interface pass.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct InterfaceReport {
    pub max_temperature: f64,
    pub max_heat_flux_density: f64,
    pub heat_flux_integral: f64,
}

impl InterfaceReport {
    pub fn record(&mut self, sample: &InterfaceSample) {
        if let Some(t) = sample.temperature {
            self.max_temperature = self.max_temperature.max(t);
        }
        self.max_heat_flux_density = self.max_heat_flux_density.max(sample.heat_flux_density);
        self.heat_flux_integral += sample.heat_flux_density * sample.area;
    }
}

/// Read-only state a boundary condition may consult.
pub struct BoundaryContext<'a> {
    pub mesh: &'a DualMesh,
    pub config: &'a HeatConfig,
    pub field: &'a HeatField,
    pub flow: Option<&'a FlowField>,
    pub conjugate: &'a ConjugateVariables,
    pub convective: &'a dyn ConvectiveNumerics,
}

impl BoundaryContext<'_> {
    /// Diffusivity at `p`: effective (laminar + eddy) in flow mode, solid otherwise.
    pub fn diffusivity(&self, p: PointId) -> f64 {
        match self.flow {
            Some(flow) => self.config.flow_diffusivity(flow.eddy_viscosity(p)),
            None => self.config.solid.thermal_diffusivity(),
        }
    }

    fn temperature(&self, p: PointId) -> f64 {
        self.field.temperature(p)
    }
}

/// Weak wall term `D·(T_wall − T_nb)/dist·Area`, subtracted, with its
/// diagonal derivative `−D/dist·Area`.
fn wall_term(
    ctx: &BoundaryContext<'_>,
    vertex: &BoundaryVertex,
    diffusivity: f64,
    wall_temperature: f64,
) -> (BoundaryContribution, f64) {
    let area = vertex.area();
    let dist = ctx.mesh.wall_distance(vertex);
    let density = diffusivity * (wall_temperature - ctx.temperature(vertex.normal_neighbor)) / dist;
    let term = BoundaryContribution {
        residual: density * area,
        jacobian: Some(-diffusivity / dist * area),
        mode: Accumulate::Subtract,
    };
    (term, density)
}

/// Upwind flux through the boundary face against a prescribed exterior state.
fn boundary_flux(
    ctx: &BoundaryContext<'_>,
    flow: &FlowField,
    vertex: &BoundaryVertex,
    exterior_velocity: Vec3,
    exterior_temperature: f64,
) -> BoundaryContribution {
    let p = vertex.point;
    let interior = *flow.primitive(p);
    let exterior = FlowPrimitive {
        pressure: interior.pressure,
        velocity: exterior_velocity,
    };
    let flux = ctx.convective.compute(&ConvectiveInput {
        normal: negate(vertex.normal),
        temperature: [ctx.temperature(p), exterior_temperature],
        primitive: [interior, exterior],
    });
    BoundaryContribution {
        residual: flux.residual,
        jacobian: Some(flux.jacobian_i),
        mode: Accumulate::Add,
    }
}

impl BoundaryCondition {
    /// Terms for one vertex of marker `marker` (vertex index `index`).
    pub fn apply(
        &self,
        ctx: &BoundaryContext<'_>,
        marker: usize,
        index: usize,
        vertex: &BoundaryVertex,
    ) -> Result<BoundaryTerms, HeatError> {
        let mut terms = BoundaryTerms::default();
        match self {
            Self::Isothermal { wall_temperature } => {
                let d = ctx.diffusivity(vertex.point);
                terms.diffusive = Some(wall_term(ctx, vertex, d, *wall_temperature).0);
            }
            Self::HeatFlux { flux } => {
                terms.diffusive = Some(BoundaryContribution {
                    residual: flux * vertex.area(),
                    jacobian: None,
                    mode: Accumulate::Subtract,
                });
            }
            Self::Inlet { velocity } => {
                let t_inf = ctx.config.temperature_freestream_nd();
                if let Some(flow) = ctx.flow {
                    terms.convective = Some(boundary_flux(ctx, flow, vertex, *velocity, t_inf));
                }
                // Laminar anchor towards the freestream temperature, applied in every mode.
                let d = ctx.config.laminar_diffusivity();
                terms.diffusive = Some(wall_term(ctx, vertex, d, t_inf).0);
            }
            Self::Outlet => {
                if let Some(flow) = ctx.flow {
                    let nb = vertex.normal_neighbor;
                    let velocity = flow.primitive(nb).velocity;
                    let t_nb = ctx.temperature(nb);
                    terms.convective = Some(boundary_flux(ctx, flow, vertex, velocity, t_nb));
                }
            }
            Self::ConjugateInterface => {
                if ctx.flow.is_some() {
                    let t_wall = ctx.conjugate.get(marker, index, ConjugateVar::Temperature)?;
                    let d = ctx.config.laminar_diffusivity();
                    let (term, density) = wall_term(ctx, vertex, d, t_wall);
                    terms.diffusive = Some(term);
                    terms.interface = Some(InterfaceSample {
                        temperature: Some(t_wall),
                        heat_flux_density: density,
                        area: vertex.area(),
                    });
                } else {
                    let q = ctx
                        .conjugate
                        .get(marker, index, ConjugateVar::HeatFluxDensity)?;
                    terms.diffusive = Some(BoundaryContribution {
                        residual: -q * vertex.area(),
                        jacobian: None,
                        mode: Accumulate::Subtract,
                    });
                    terms.interface = Some(InterfaceSample {
                        temperature: None,
                        heat_flux_density: q,
                        area: vertex.area(),
                    });
                }
            }
        }
        Ok(terms)
    }

    /// Heat flux through one vertex for monitoring, or `None` if this kind
    /// is not monitored.
    ///
    /// Uses the same diffusivity as the isothermal wall term; conjugate
    /// interfaces take the wall temperature from the current solution.
    pub fn monitored_heat_flux(
        &self,
        ctx: &BoundaryContext<'_>,
        vertex: &BoundaryVertex,
    ) -> Option<f64> {
        let t_wall = match self {
            Self::Isothermal { wall_temperature } => *wall_temperature,
            Self::ConjugateInterface => ctx.temperature(vertex.point),
            _ => return None,
        };
        let d = ctx.diffusivity(vertex.point);
        let dist = ctx.mesh.wall_distance(vertex);
        Some(d * (t_wall - ctx.temperature(vertex.normal_neighbor)) / dist * vertex.area())
    }
}

/// Add a boundary contribution to the row of `p`.
///
/// The Jacobian entry is dropped for explicit schemes.
pub fn accumulate(
    residual: &mut [f64],
    jacobian: &mut SparseMatrix,
    p: PointId,
    term: &BoundaryContribution,
    implicit: bool,
) {
    let sign = match term.mode {
        Accumulate::Add => 1.0,
        Accumulate::Subtract => -1.0,
    };
    residual[p.index()] += sign * term.residual;
    if implicit {
        if let Some(j) = term.jacobian {
            jacobian.add_val_to_diag(p, sign * j);
        }
    }
}

impl HeatSolver {
    /// Apply every marker's boundary condition to its owned vertices.
    pub fn apply_boundary_conditions(
        &mut self,
        mesh: &DualMesh,
        flow: Option<&FlowField>,
    ) -> Result<(), HeatError> {
        let implicit = self.config.is_implicit();
        let ctx = BoundaryContext {
            mesh,
            config: &self.config,
            field: &self.field,
            flow,
            conjugate: &self.conjugate,
            convective: self.convective.as_ref(),
        };

        for (m, marker) in mesh.markers().iter().enumerate() {
            let condition = &self.boundaries[m].condition;
            let mut report = matches!(condition, BoundaryCondition::ConjugateInterface)
                .then(InterfaceReport::default);

            for (k, vertex) in marker.vertices().iter().enumerate() {
                if !mesh.is_domain(vertex.point) {
                    continue;
                }
                let terms = condition.apply(&ctx, m, k, vertex)?;
                for term in [terms.convective, terms.diffusive].iter().flatten() {
                    accumulate(
                        &mut self.residual,
                        &mut self.jacobian,
                        vertex.point,
                        term,
                        implicit,
                    );
                }
                if let (Some(report), Some(sample)) = (report.as_mut(), terms.interface.as_ref()) {
                    report.record(sample);
                }
            }

            if let Some(report) = &report {
                log::debug!(
                    "interface `{}`: max T {:.6e}, max q {:.6e}, integrated q {:.6e}",
                    marker.tag(),
                    report.max_temperature,
                    report.max_heat_flux_density,
                    report.heat_flux_integral
                );
            }
            self.interface_reports[m] = report;
        }
        Ok(())
    }

    /// Wall heat flux through monitored markers, summed over all partitions.
    pub fn heat_fluxes<C: Communicator>(
        &self,
        mesh: &DualMesh,
        flow: Option<&FlowField>,
        comm: &C,
    ) -> Result<HeatFluxReport, HeatError> {
        let ctx = BoundaryContext {
            mesh,
            config: &self.config,
            field: &self.field,
            flow,
            conjugate: &self.conjugate,
            convective: self.convective.as_ref(),
        };

        let per_marker: Vec<f64> = mesh
            .markers()
            .iter()
            .zip(&self.boundaries)
            .map(|(marker, binding)| {
                if !binding.monitoring {
                    return 0.0;
                }
                marker
                    .vertices()
                    .iter()
                    .filter(|v| mesh.is_domain(v.point))
                    .filter_map(|v| binding.condition.monitored_heat_flux(&ctx, v))
                    .sum()
            })
            .collect();

        let total = comm.all_reduce_sum(per_marker.iter().sum())?;
        Ok(HeatFluxReport { per_marker, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverMode;
    use crate::numerics::ScalarUpwind;
    use crate::topology::mesh::MeshBuilder;

    /// Two points 0.5 apart; vertex at point 0 with inward normal of area 2.
    fn wall_mesh() -> (DualMesh, BoundaryVertex) {
        let mut b = MeshBuilder::new(2);
        let p0 = b.point([0.0; 3], 1.0);
        let p1 = b.point([0.5, 0.0, 0.0], 1.0);
        b.edge(p0, p1, [2.0, 0.0, 0.0]);
        let vertex = BoundaryVertex {
            point: p0,
            normal: [2.0, 0.0, 0.0],
            normal_neighbor: p1,
        };
        b.marker("wall", vec![vertex]);
        (b.build().unwrap(), vertex)
    }

    fn solid_config() -> HeatConfig {
        let mut config = HeatConfig::default();
        config.temperature_freestream = 300.0;
        config.solid.conductivity = 3.0;
        config
    }

    #[test]
    fn isothermal_wall_term_and_jacobian() {
        let (mesh, vertex) = wall_mesh();
        let config = solid_config();
        let field = HeatField::from_solution(vec![0.0, 0.5]);
        let conjugate = ConjugateVariables::new(&mesh, 0.0);
        let ctx = BoundaryContext {
            mesh: &mesh,
            config: &config,
            field: &field,
            flow: None,
            conjugate: &conjugate,
            convective: &ScalarUpwind,
        };
        let bc = BoundaryCondition::from_config(
            &BoundaryKind::Isothermal { temperature: 600.0 },
            &config,
        );
        assert_eq!(bc, BoundaryCondition::Isothermal { wall_temperature: 2.0 });

        let terms = bc.apply(&ctx, 0, 0, &vertex).unwrap();
        let diffusive = terms.diffusive.unwrap();
        // D = 3, dist = 0.5, area = 2
        assert_eq!(diffusive.mode, Accumulate::Subtract);
        assert!((diffusive.residual - 3.0 * 1.5 / 0.5 * 2.0).abs() < 1e-12);
        assert_eq!(diffusive.jacobian, Some(-3.0 / 0.5 * 2.0));
        assert!(terms.convective.is_none());
    }

    #[test]
    fn heat_flux_has_no_jacobian_and_scales_in_solid_mode() {
        let (mesh, vertex) = wall_mesh();
        let mut config = solid_config();
        config.solid.density = 2.0;
        config.solid.specific_heat = 5.0;
        let field = HeatField::uniform(2, 123.0);
        let conjugate = ConjugateVariables::new(&mesh, 0.0);
        let ctx = BoundaryContext {
            mesh: &mesh,
            config: &config,
            field: &field,
            flow: None,
            conjugate: &conjugate,
            convective: &ScalarUpwind,
        };
        let bc = BoundaryCondition::from_config(&BoundaryKind::HeatFlux { flux: 20.0 }, &config);
        let terms = bc.apply(&ctx, 0, 0, &vertex).unwrap();
        let diffusive = terms.diffusive.unwrap();
        assert_eq!(diffusive.residual, 2.0 * 2.0);
        assert_eq!(diffusive.jacobian, None);
    }

    #[test]
    fn conjugate_solid_side_imposes_partner_flux() {
        let (mesh, vertex) = wall_mesh();
        let config = solid_config();
        let field = HeatField::uniform(2, 1.0);
        let mut conjugate = ConjugateVariables::new(&mesh, 0.0);
        conjugate
            .set(0, 0, ConjugateVar::HeatFluxDensity, 4.0)
            .unwrap();
        let ctx = BoundaryContext {
            mesh: &mesh,
            config: &config,
            field: &field,
            flow: None,
            conjugate: &conjugate,
            convective: &ScalarUpwind,
        };
        let terms = BoundaryCondition::ConjugateInterface
            .apply(&ctx, 0, 0, &vertex)
            .unwrap();
        let diffusive = terms.diffusive.unwrap();
        assert_eq!(diffusive.residual, -8.0);
        assert_eq!(diffusive.jacobian, None);

        let mut report = InterfaceReport::default();
        report.record(&terms.interface.unwrap());
        assert_eq!(report.heat_flux_integral, 8.0);
        assert_eq!(report.max_heat_flux_density, 4.0);
        assert_eq!(report.max_temperature, 0.0);
    }

    #[test]
    fn inlet_in_flow_mode_adds_upwind_and_anchor() {
        let (mesh, vertex) = wall_mesh();
        let mut config = solid_config();
        config.mode = SolverMode::Flow;
        config.viscosity_freestream_nd = 0.72;
        config.velocity_ref = 2.0;
        let field = HeatField::from_solution(vec![1.5, 1.0]);
        let flow = FlowField::uniform(2, [0.0; 3], 1.0);
        let conjugate = ConjugateVariables::new(&mesh, 0.0);
        let ctx = BoundaryContext {
            mesh: &mesh,
            config: &config,
            field: &field,
            flow: Some(&flow),
            conjugate: &conjugate,
            convective: &ScalarUpwind,
        };
        let bc = BoundaryCondition::from_config(
            &BoundaryKind::Inlet {
                velocity: 4.0,
                direction: [1.0, 0.0, 0.0],
            },
            &config,
        );
        let terms = bc.apply(&ctx, 0, 0, &vertex).unwrap();

        // Outward normal is [-2, 0, 0]; q = ½(0 + 2)·(-2) = -2, inflow.
        let convective = terms.convective.unwrap();
        assert_eq!(convective.mode, Accumulate::Add);
        assert_eq!(convective.residual, -2.0 * 1.0);
        assert_eq!(convective.jacobian, Some(0.0));

        // Anchor: D = 1, T_inf = 1, T_nb = 1, so no residual but a Jacobian.
        let diffusive = terms.diffusive.unwrap();
        assert_eq!(diffusive.residual, 0.0);
        assert_eq!(diffusive.jacobian, Some(-1.0 / 0.5 * 2.0));
    }

    #[test]
    fn conjugate_fluid_side_is_a_wall_at_partner_temperature() {
        let (mesh, vertex) = wall_mesh();
        let mut config = solid_config();
        config.mode = SolverMode::Flow;
        config.viscosity_freestream_nd = 0.72;
        let field = HeatField::from_solution(vec![9.0, 0.5]);
        let mut flow = FlowField::uniform(2, [0.0; 3], 1.0);
        // eddy viscosity does not enter the interface term
        flow.eddy_viscosity_mut().fill(5.0);
        let mut conjugate = ConjugateVariables::new(&mesh, 0.0);
        conjugate.set(0, 0, ConjugateVar::Temperature, 2.0).unwrap();
        let ctx = BoundaryContext {
            mesh: &mesh,
            config: &config,
            field: &field,
            flow: Some(&flow),
            conjugate: &conjugate,
            convective: &ScalarUpwind,
        };
        let terms = BoundaryCondition::ConjugateInterface
            .apply(&ctx, 0, 0, &vertex)
            .unwrap();

        // D = 0.72/0.72, q = 1 · (2 − 0.5)/0.5 = 3
        let diffusive = terms.diffusive.unwrap();
        assert_eq!(diffusive.mode, Accumulate::Subtract);
        assert!((diffusive.residual - 3.0 * 2.0).abs() < 1e-12);
        assert_eq!(diffusive.jacobian, Some(-1.0 / 0.5 * 2.0));
        assert!(terms.convective.is_none());

        let sample = terms.interface.unwrap();
        assert_eq!(sample.temperature, Some(2.0));
        assert!((sample.heat_flux_density - 3.0).abs() < 1e-12);
        assert_eq!(sample.area, 2.0);
    }

    #[test]
    fn outlet_copies_neighbour_velocity_and_temperature() {
        let (mesh, vertex) = wall_mesh();
        let mut config = solid_config();
        config.mode = SolverMode::Flow;
        let field = HeatField::from_solution(vec![1.5, 4.0]);
        let mut flow = FlowField::uniform(2, [0.0; 3], 1.0);
        flow.primitives_mut()[1].velocity = [2.0, 0.0, 0.0];
        let conjugate = ConjugateVariables::new(&mesh, 0.0);
        let ctx = BoundaryContext {
            mesh: &mesh,
            config: &config,
            field: &field,
            flow: Some(&flow),
            conjugate: &conjugate,
            convective: &ScalarUpwind,
        };
        let terms = BoundaryCondition::Outlet.apply(&ctx, 0, 0, &vertex).unwrap();

        // q = ½(0 + 2)·(−2) = −2, so the exterior value T_nb = 4 is carried in.
        let convective = terms.convective.unwrap();
        assert_eq!(convective.mode, Accumulate::Add);
        assert_eq!(convective.residual, -2.0 * 4.0);
        assert_eq!(convective.jacobian, Some(0.0));
        assert!(terms.diffusive.is_none());
    }

    #[test]
    fn solid_monitoring_uses_solid_diffusivity() {
        let (mesh, vertex) = wall_mesh();
        let config = solid_config();
        let field = HeatField::from_solution(vec![0.0, 0.5]);
        let conjugate = ConjugateVariables::new(&mesh, 0.0);
        let ctx = BoundaryContext {
            mesh: &mesh,
            config: &config,
            field: &field,
            flow: None,
            conjugate: &conjugate,
            convective: &ScalarUpwind,
        };
        let wall = BoundaryCondition::Isothermal {
            wall_temperature: 2.0,
        };
        // same density as the wall term: k = 3, (2 − 0.5)/0.5 · 2
        let monitored = wall.monitored_heat_flux(&ctx, &vertex).unwrap();
        let applied = wall.apply(&ctx, 0, 0, &vertex).unwrap().diffusive.unwrap();
        assert!((monitored - 18.0).abs() < 1e-12);
        assert_eq!(monitored, applied.residual);
        assert_eq!(BoundaryCondition::Outlet.monitored_heat_flux(&ctx, &vertex), None);
    }

    #[test]
    fn outlet_is_inactive_without_flow() {
        let (mesh, vertex) = wall_mesh();
        let config = solid_config();
        let field = HeatField::uniform(2, 1.0);
        let conjugate = ConjugateVariables::new(&mesh, 0.0);
        let ctx = BoundaryContext {
            mesh: &mesh,
            config: &config,
            field: &field,
            flow: None,
            conjugate: &conjugate,
            convective: &ScalarUpwind,
        };
        let terms = BoundaryCondition::Outlet.apply(&ctx, 0, 0, &vertex).unwrap();
        assert_eq!(terms, BoundaryTerms::default());
    }

    #[test]
    fn bad_conjugate_index_is_reported() {
        let (mesh, vertex) = wall_mesh();
        let config = solid_config();
        let field = HeatField::uniform(2, 1.0);
        let conjugate = ConjugateVariables::new(&mesh, 0.0);
        let ctx = BoundaryContext {
            mesh: &mesh,
            config: &config,
            field: &field,
            flow: None,
            conjugate: &conjugate,
            convective: &ScalarUpwind,
        };
        let err = BoundaryCondition::ConjugateInterface.apply(&ctx, 0, 3, &vertex);
        assert_eq!(
            err,
            Err(HeatError::ConjugateIndex {
                marker: 0,
                vertex: 3
            })
        );
    }
}
