//! Solver configuration.
//!
//! `HeatConfig` is plain data: parsing it from a file is left to the caller
//! (any serde format works). Dimensional inputs (wall temperatures, inlet
//! velocity) are non-dimensionalised by the solver using the reference
//! values below.

use serde::{Deserialize, Serialize};

use crate::geometry::metrics::{Vec3, norm};
use crate::heat_error::HeatError;

/// Whether the heat equation is coupled to a flow field.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverMode {
    /// Stand-alone conduction in a solid; convection is skipped.
    #[default]
    HeatEquation,
    /// Temperature transported by an external flow solution.
    Flow,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeMarching {
    #[default]
    Steady,
    TimeStepping,
    DualTime1st,
    DualTime2nd,
}

impl TimeMarching {
    pub fn is_dual_time(self) -> bool {
        matches!(self, Self::DualTime1st | Self::DualTime2nd)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeIntegration {
    #[default]
    EulerImplicit,
    EulerExplicit,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientMethod {
    #[default]
    GreenGauss,
    WeightedLeastSquares,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvectiveScheme {
    #[default]
    ScalarUpwind,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViscousScheme {
    /// Averaged gradient with edge-direction correction.
    #[default]
    AvgGradCorrected,
    /// Averaged gradient projected on the face normal only.
    AvgGrad,
}

/// Turbulence model of the coupled flow solver; only affects restart layout.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurbulenceModel {
    #[default]
    None,
    Sa,
    Sst,
}

/// How the temperature column of a flow restart file is located.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartColumnPolicy {
    /// Every non-SA flow restart uses the SST column layout, as legacy
    /// restart files were written.
    #[default]
    Legacy,
    /// Laminar, SA and SST restarts each use their own column count.
    AsDocumented,
}

/// Material properties for solid conduction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolidProperties {
    pub density: f64,
    pub specific_heat: f64,
    pub conductivity: f64,
}

impl Default for SolidProperties {
    fn default() -> Self {
        Self {
            density: 1.0,
            specific_heat: 1.0,
            conductivity: 1.0,
        }
    }
}

impl SolidProperties {
    /// Volumetric heat capacity ρ·c_p.
    #[inline]
    pub fn rho_cp(&self) -> f64 {
        self.density * self.specific_heat
    }

    /// Thermal diffusivity k / (ρ·c_p).
    #[inline]
    pub fn thermal_diffusivity(&self) -> f64 {
        self.conductivity / self.rho_cp()
    }
}

/// Boundary kind and its parameters, as configured per marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoundaryKind {
    /// Wall at a fixed (dimensional) temperature.
    Isothermal { temperature: f64 },
    /// Wall with a prescribed heat flux.
    HeatFlux { flux: f64 },
    /// Inflow with prescribed (dimensional) speed and direction.
    Inlet { velocity: f64, direction: Vec3 },
    Outlet,
    /// Interface with a paired solver instance; data via conjugate variables.
    ConjugateInterface,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerConfig {
    pub tag: String,
    #[serde(flatten)]
    pub kind: BoundaryKind,
    /// Include the marker in the heat-flux report.
    #[serde(default)]
    pub monitoring: bool,
}

impl MarkerConfig {
    pub fn new(tag: impl Into<String>, kind: BoundaryKind) -> Self {
        Self {
            tag: tag.into(),
            kind,
            monitoring: false,
        }
    }

    pub fn monitored(mut self) -> Self {
        self.monitoring = true;
        self
    }
}

/// Settings for the built-in Krylov solver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearSolverConfig {
    /// Relative residual reduction.
    pub rtol: f64,
    /// Absolute residual floor.
    pub atol: f64,
    pub max_iter: usize,
}

impl Default for LinearSolverConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-14,
            max_iter: 200,
        }
    }
}

/// Complete configuration of a heat solver instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatConfig {
    pub mode: SolverMode,
    pub time_marching: TimeMarching,
    pub time_integration: TimeIntegration,
    pub gradient: GradientMethod,
    /// Second-order face reconstruction for the convective flux.
    pub muscl: bool,
    pub convective: ConvectiveScheme,
    pub viscous: ViscousScheme,
    pub turbulence: TurbulenceModel,
    pub restart_columns: RestartColumnPolicy,
    pub prandtl_laminar: f64,
    pub prandtl_turbulent: f64,
    /// Non-dimensional freestream laminar viscosity.
    pub viscosity_freestream_nd: f64,
    /// Dimensional freestream temperature, also the reference temperature.
    pub temperature_freestream: f64,
    pub velocity_ref: f64,
    pub solid: SolidProperties,
    pub cfl: f64,
    pub max_delta_time: f64,
    /// Scales the flow solver's local time step in the diagonal term.
    pub cfl_reduction_turb: f64,
    /// Physical time step for dual-time stepping (non-dimensional).
    pub unsteady_time_step: f64,
    pub markers: Vec<MarkerConfig>,
    pub linear_solver: LinearSolverConfig,
}

impl Default for HeatConfig {
    fn default() -> Self {
        Self {
            mode: SolverMode::default(),
            time_marching: TimeMarching::default(),
            time_integration: TimeIntegration::default(),
            gradient: GradientMethod::default(),
            muscl: true,
            convective: ConvectiveScheme::default(),
            viscous: ViscousScheme::default(),
            turbulence: TurbulenceModel::default(),
            restart_columns: RestartColumnPolicy::default(),
            prandtl_laminar: 0.72,
            prandtl_turbulent: 0.9,
            viscosity_freestream_nd: 1.0,
            temperature_freestream: 288.15,
            velocity_ref: 1.0,
            solid: SolidProperties::default(),
            cfl: 10.0,
            max_delta_time: 1e6,
            cfl_reduction_turb: 1.0,
            unsteady_time_step: 0.0,
            markers: Vec::new(),
            linear_solver: LinearSolverConfig::default(),
        }
    }
}

impl HeatConfig {
    #[inline]
    pub fn is_flow(&self) -> bool {
        self.mode == SolverMode::Flow
    }

    #[inline]
    pub fn is_implicit(&self) -> bool {
        self.time_integration == TimeIntegration::EulerImplicit
    }

    /// Reference temperature used for non-dimensionalisation.
    #[inline]
    pub fn temperature_ref(&self) -> f64 {
        self.temperature_freestream
    }

    /// Non-dimensional freestream temperature.
    #[inline]
    pub fn temperature_freestream_nd(&self) -> f64 {
        self.temperature_freestream / self.temperature_ref()
    }

    /// Laminar thermal diffusivity μ_lam / Pr_lam.
    #[inline]
    pub fn laminar_diffusivity(&self) -> f64 {
        self.viscosity_freestream_nd / self.prandtl_laminar
    }

    /// Effective diffusivity μ_lam / Pr_lam + μ_t / Pr_t.
    #[inline]
    pub fn flow_diffusivity(&self, eddy_viscosity: f64) -> f64 {
        self.laminar_diffusivity() + eddy_viscosity / self.prandtl_turbulent
    }

    pub fn marker(&self, tag: &str) -> Option<&MarkerConfig> {
        self.markers.iter().find(|m| m.tag == tag)
    }

    /// Check ranges and consistency.
    pub fn validate(&self) -> Result<(), HeatError> {
        fn positive(name: &str, value: f64) -> Result<(), HeatError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(HeatError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )))
            }
        }

        positive("prandtl_laminar", self.prandtl_laminar)?;
        positive("prandtl_turbulent", self.prandtl_turbulent)?;
        positive("temperature_freestream", self.temperature_freestream)?;
        positive("velocity_ref", self.velocity_ref)?;
        positive("cfl", self.cfl)?;
        positive("max_delta_time", self.max_delta_time)?;
        positive("cfl_reduction_turb", self.cfl_reduction_turb)?;
        positive("solid.density", self.solid.density)?;
        positive("solid.specific_heat", self.solid.specific_heat)?;
        positive("solid.conductivity", self.solid.conductivity)?;
        positive("linear_solver.rtol", self.linear_solver.rtol)?;
        if self.viscosity_freestream_nd < 0.0 || !self.viscosity_freestream_nd.is_finite() {
            return Err(HeatError::InvalidConfig(format!(
                "viscosity_freestream_nd must be non-negative, got {}",
                self.viscosity_freestream_nd
            )));
        }
        if self.linear_solver.max_iter == 0 {
            return Err(HeatError::InvalidConfig(
                "linear_solver.max_iter must be at least 1".into(),
            ));
        }
        if self.time_marching.is_dual_time() {
            positive("unsteady_time_step", self.unsteady_time_step)?;
        }

        for (i, marker) in self.markers.iter().enumerate() {
            if self.markers[..i].iter().any(|m| m.tag == marker.tag) {
                return Err(HeatError::InvalidConfig(format!(
                    "marker `{}` configured twice",
                    marker.tag
                )));
            }
            if let BoundaryKind::Inlet { direction, .. } = &marker.kind {
                if norm(*direction) == 0.0 {
                    return Err(HeatError::InvalidConfig(format!(
                        "inlet `{}` has a zero flow direction",
                        marker.tag
                    )));
                }
            }
        }
        Ok(())
    }
}
