//! Conjugate heat-transfer variables exchanged at interface markers.
//!
//! One record per (marker, vertex). The coupling driver writes the partner
//! zone's values with [`ConjugateVariables::set`] before an iteration and the
//! interface boundary condition reads them back.

use crate::heat_error::HeatError;
use crate::topology::mesh::DualMesh;

/// Slot inside a conjugate record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum ConjugateVar {
    /// Interface temperature imposed on the fluid side.
    Temperature = 0,
    /// Heat-flux density imposed on the solid side.
    HeatFluxDensity = 1,
}

const N_CONJUGATE_VARS: usize = 2;

/// Table of conjugate values, per marker, per vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct ConjugateVariables {
    values: Vec<Vec<[f64; N_CONJUGATE_VARS]>>,
}

impl ConjugateVariables {
    /// Allocate a record for every vertex of every marker.
    ///
    /// Temperatures start at `initial_temperature`, fluxes at zero.
    pub fn new(mesh: &DualMesh, initial_temperature: f64) -> Self {
        let values = mesh
            .markers()
            .iter()
            .map(|m| vec![[initial_temperature, 0.0]; m.vertices().len()])
            .collect();
        Self { values }
    }

    pub fn get(&self, marker: usize, vertex: usize, var: ConjugateVar) -> Result<f64, HeatError> {
        self.values
            .get(marker)
            .and_then(|m| m.get(vertex))
            .map(|record| record[var as usize])
            .ok_or(HeatError::ConjugateIndex { marker, vertex })
    }

    pub fn set(
        &mut self,
        marker: usize,
        vertex: usize,
        var: ConjugateVar,
        value: f64,
    ) -> Result<(), HeatError> {
        let record = self
            .values
            .get_mut(marker)
            .and_then(|m| m.get_mut(vertex))
            .ok_or(HeatError::ConjugateIndex { marker, vertex })?;
        record[var as usize] = value;
        Ok(())
    }
}
