//! Edge loops: convective and viscous residual and Jacobian assembly.
//!
//! Every edge flux is added at one endpoint and subtracted at the other, so
//! interior contributions cancel in the global sum. The two loops use
//! opposite signs: a convective flux leaves the tail, a diffusive flux
//! `D·∂T/∂n` enters it.

use crate::data::flow::FlowField;
use crate::geometry::metrics::{dot, midpoint_offsets};
use crate::numerics::{ConvectiveInput, FluxResult, ViscousInput};
use crate::solver::HeatSolver;
use crate::topology::mesh::{DualMesh, Edge};

impl HeatSolver {
    pub fn reset_residual_and_jacobian(&mut self) {
        self.residual.fill(0.0);
        self.jacobian.set_zero();
    }

    /// Upwind transport of temperature through one face.
    pub fn accumulate_convective(&mut self, mesh: &DualMesh, flow: &FlowField, edge: &Edge) {
        let (i, j) = (edge.tail(), edge.head());
        let mut temperature = [self.field.temperature(i), self.field.temperature(j)];
        let mut primitive = [*flow.primitive(i), *flow.primitive(j)];

        if self.config.muscl {
            let (di, dj) = midpoint_offsets(mesh.coord(i), mesh.coord(j));
            temperature[0] += dot(self.field.gradient(i), di);
            temperature[1] += dot(self.field.gradient(j), dj);
            primitive[0] = primitive[0].extrapolate(flow.gradient(i), di);
            primitive[1] = primitive[1].extrapolate(flow.gradient(j), dj);
        }

        let flux = self.convective.compute(&ConvectiveInput {
            normal: edge.normal,
            temperature,
            primitive,
        });
        self.scatter_edge_flux(edge, &flux, 1.0);
    }

    /// Diffusive flux through one face.
    pub fn accumulate_viscous(&mut self, mesh: &DualMesh, flow: Option<&FlowField>, edge: &Edge) {
        let (i, j) = (edge.tail(), edge.head());
        let diffusivity = match flow {
            Some(flow) => [
                self.config.flow_diffusivity(flow.eddy_viscosity(i)),
                self.config.flow_diffusivity(flow.eddy_viscosity(j)),
            ],
            None => [self.config.solid.thermal_diffusivity(); 2],
        };

        let flux = self.viscous.compute(&ViscousInput {
            coords: [mesh.coord(i), mesh.coord(j)],
            normal: edge.normal,
            gradient: [self.field.gradient(i), self.field.gradient(j)],
            temperature: [self.field.temperature(i), self.field.temperature(j)],
            diffusivity,
        });
        self.scatter_edge_flux(edge, &flux, -1.0);
    }

    /// Convective (flow mode) and viscous contributions of every edge.
    pub fn assemble_edges(&mut self, mesh: &DualMesh, flow: Option<&FlowField>) {
        for edge in mesh.edges() {
            if let Some(flow) = flow {
                self.accumulate_convective(mesh, flow, edge);
            }
            self.accumulate_viscous(mesh, flow, edge);
        }
    }

    /// `sign·flux` at the tail, `−sign·flux` at the head, with matching
    /// Jacobian blocks.
    fn scatter_edge_flux(&mut self, edge: &Edge, flux: &FluxResult, sign: f64) {
        let (i, j) = (edge.tail(), edge.head());
        self.residual[i.index()] += sign * flux.residual;
        self.residual[j.index()] -= sign * flux.residual;

        let jac = &mut self.jacobian;
        jac.add_block(i, i, sign * flux.jacobian_i);
        jac.add_block(i, j, sign * flux.jacobian_j);
        jac.subtract_block(j, i, sign * flux.jacobian_i);
        jac.subtract_block(j, j, sign * flux.jacobian_j);
    }
}
